//! Blob facade over an injected store

use std::sync::Arc;

use bson::Document;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{BlobError, Result};
use crate::stores::{BlobReader, BlobSource, BlobStore, StoredBlob};

/// Reads and writes named blobs through a [`BlobStore`].
///
/// Holds nothing but the store handle, so clones are cheap and calls may run
/// concurrently. Writes with the same filename are neither deduplicated nor
/// serialized; each creates its own record.
#[derive(Clone)]
pub struct BlobFacade {
    store: Arc<dyn BlobStore>,
}

impl BlobFacade {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store_type(&self) -> &'static str {
        self.store.store_type()
    }

    /// Store `content` under `filename` in `bucket`.
    ///
    /// `content` is closed on every exit path. A failing close is logged and
    /// never replaces the result of the write itself.
    pub async fn write<S>(
        &self,
        bucket: &str,
        content: Option<S>,
        filename: &str,
        metadata: Option<Document>,
    ) -> Result<StoredBlob>
    where
        S: BlobSource,
    {
        let mut content =
            content.ok_or_else(|| BlobError::invalid_argument("content must not be absent"))?;

        if let Err(e) = validate_filename(filename) {
            close_quietly(&mut content, bucket, filename).await;
            return Err(e);
        }

        debug!(
            "PUT {}/{} via {} (metadata: {})",
            bucket,
            filename,
            self.store.store_type(),
            metadata.is_some()
        );

        let result = self
            .store
            .bucket(bucket)
            .upload(filename, metadata, &mut content)
            .await;

        close_quietly(&mut content, bucket, filename).await;

        result
    }

    /// Open the first blob stored under `filename` in `bucket`
    pub async fn read(&self, bucket: &str, filename: &str) -> Result<BlobReader> {
        debug!("GET {}/{}", bucket, filename);

        let session = self.store.bucket(bucket);
        let blob = session
            .find_one(filename)
            .await?
            .ok_or_else(|| BlobError::not_found(bucket, filename))?;

        session.open(&blob).await
    }

    /// Stored record (with metadata) of the first blob under `filename`
    pub async fn stat(&self, bucket: &str, filename: &str) -> Result<StoredBlob> {
        debug!("HEAD {}/{}", bucket, filename);

        self.store
            .bucket(bucket)
            .find_one(filename)
            .await?
            .ok_or_else(|| BlobError::not_found(bucket, filename))
    }

    /// Read the whole blob into memory
    pub async fn read_bytes(&self, bucket: &str, filename: &str) -> Result<Bytes> {
        self.read(bucket, filename).await?.read_to_bytes().await
    }
}

fn validate_filename(filename: &str) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(BlobError::invalid_argument("filename must not be empty"));
    }
    if filename.contains('\0') {
        return Err(BlobError::invalid_argument(
            "filename must not contain NUL characters",
        ));
    }
    Ok(())
}

async fn close_quietly(content: &mut dyn BlobSource, bucket: &str, filename: &str) {
    if let Err(e) = content.close().await {
        warn!("Ignoring error closing source for {}/{}: {}", bucket, filename, e);
    }
}
