//! Error types for the blob storage facade

use thiserror::Error;

/// Errors that can occur while storing or fetching blobs
#[derive(Error, Debug)]
pub enum BlobError {
    /// Caller supplied missing content, an empty filename, or a malformed
    /// metadata document
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No stored blob matches the filename in the bucket
    #[error("Blob not found: {bucket}/{filename}")]
    NotFound { bucket: String, filename: String },

    /// Communication or I/O failure in the backing store
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Store configuration could not be resolved
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl BlobError {
    /// Create an invalid argument error with custom message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        BlobError::InvalidArgument(msg.into())
    }

    /// Create a "not found" error for a bucket/filename pair
    pub fn not_found(bucket: impl Into<String>, filename: impl Into<String>) -> Self {
        BlobError::NotFound {
            bucket: bucket.into(),
            filename: filename.into(),
        }
    }

    /// Create a storage failure with custom message
    pub fn storage_failure(msg: impl Into<String>) -> Self {
        BlobError::StorageFailure(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound { .. })
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(self, BlobError::StorageFailure(_))
    }
}

impl From<mongodb::error::Error> for BlobError {
    fn from(error: mongodb::error::Error) -> Self {
        BlobError::StorageFailure(error.to_string())
    }
}

impl From<std::io::Error> for BlobError {
    fn from(error: std::io::Error) -> Self {
        BlobError::StorageFailure(error.to_string())
    }
}

impl From<bson::ser::Error> for BlobError {
    fn from(error: bson::ser::Error) -> Self {
        BlobError::InvalidArgument(format!("metadata is not a valid document: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, BlobError>;
