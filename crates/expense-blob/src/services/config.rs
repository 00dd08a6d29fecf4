//! GridFS store configuration types

use serde::{Deserialize, Serialize};

use crate::error::{BlobError, Result};

/// Default MongoDB connection URL
pub const DEFAULT_MONGODB_URL: &str = "mongodb://localhost:27017";
/// Default database holding the GridFS buckets
pub const DEFAULT_DATABASE: &str = "expenses";
/// Default GridFS chunk size (255 KiB, the driver default)
pub const DEFAULT_CHUNK_SIZE_BYTES: u32 = 255 * 1024;
/// Chunks are stored as single documents and must stay below the 16 MiB BSON limit
pub const MAX_CHUNK_SIZE_BYTES: u32 = 15 * 1024 * 1024;

/// User-provided configuration for the GridFS store (with defaults)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GridFsInputConfig {
    /// MongoDB connection URL (e.g., "mongodb://localhost:27017")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Database name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Chunk size used for new uploads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size_bytes: Option<u32>,
}

/// Resolved configuration for the GridFS store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridFsConfig {
    pub url: String,
    pub database: String,
    pub chunk_size_bytes: u32,
}

impl Default for GridFsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MONGODB_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }
}

impl From<GridFsInputConfig> for GridFsConfig {
    fn from(input: GridFsInputConfig) -> Self {
        Self {
            url: input
                .url
                .unwrap_or_else(|| DEFAULT_MONGODB_URL.to_string()),
            database: input
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            chunk_size_bytes: input.chunk_size_bytes.unwrap_or(DEFAULT_CHUNK_SIZE_BYTES),
        }
    }
}

impl GridFsConfig {
    /// Check the resolved values before a connection is attempted
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("mongodb://") || self.url.starts_with("mongodb+srv://")) {
            return Err(BlobError::InvalidConfiguration(format!(
                "MongoDB URL must use the mongodb:// or mongodb+srv:// scheme: {}",
                redact_url(&self.url)
            )));
        }

        // MongoDB rejects these characters in database names
        if self.database.is_empty()
            || self
                .database
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '.' | ' ' | '"' | '$' | '\0'))
        {
            return Err(BlobError::InvalidConfiguration(format!(
                "Invalid database name: '{}'",
                self.database
            )));
        }

        validate_chunk_size(self.chunk_size_bytes)
    }

    /// Connection URL with credentials masked, safe for logs
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

/// Chunk size must be non-zero and fit in a single BSON document
pub(crate) fn validate_chunk_size(chunk_size_bytes: u32) -> Result<()> {
    if chunk_size_bytes == 0 || chunk_size_bytes > MAX_CHUNK_SIZE_BYTES {
        return Err(BlobError::InvalidConfiguration(format!(
            "Chunk size must be between 1 and {} bytes, got {}",
            MAX_CHUNK_SIZE_BYTES, chunk_size_bytes
        )));
    }
    Ok(())
}

fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    // Userinfo can only appear in the authority, before the path or query
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    match authority.rsplit_once('@') {
        Some((_, hosts)) => format!("{}://***@{}{}", scheme, hosts, tail),
        None => url.to_string(),
    }
}
