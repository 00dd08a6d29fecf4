//! MongoDB GridFS implementation of the blob store

use std::sync::Arc;

use async_trait::async_trait;
use bson::Bson;
use chrono::Utc;
use futures::io::AsyncWriteExt;
use mongodb::{
    bson::{doc, Document},
    gridfs::{FilesCollectionDocument, GridFsBucket, GridFsUploadStream},
    options::{ClientOptions, GridFsBucketOptions},
    Client, Database,
};
use tokio_util::compat::{FuturesAsyncReadCompatExt, TokioAsyncReadCompatExt};
use tracing::{debug, error, info, warn};

use super::{BlobBucket, BlobReader, BlobSource, BlobStore, StoredBlob};
use crate::error::{BlobError, Result};
use crate::services::config::{validate_chunk_size, GridFsConfig, DEFAULT_CHUNK_SIZE_BYTES};

/// Blob store backed by GridFS buckets in a single MongoDB database
#[derive(Clone, Debug)]
pub struct GridFsStore {
    database: Database,
    chunk_size_bytes: u32,
}

impl GridFsStore {
    /// Connect to MongoDB and verify the database answers a ping
    pub async fn connect(config: &GridFsConfig) -> Result<Self> {
        config.validate()?;

        debug!("Creating GridFS store for URL: {}", config.redacted_url());

        let client_options = ClientOptions::parse(&config.url).await.map_err(|e| {
            error!("Failed to parse MongoDB URL: {}", e);
            BlobError::storage_failure(format!("Failed to parse MongoDB URL: {}", e))
        })?;

        let client = Client::with_options(client_options).map_err(|e| {
            error!("Failed to create MongoDB client: {}", e);
            BlobError::storage_failure(format!("Failed to create MongoDB client: {}", e))
        })?;

        let database = client.database(&config.database);

        // Test connection
        database.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            error!("Failed to connect to MongoDB: {}", e);
            BlobError::storage_failure(format!("Failed to connect to MongoDB: {}", e))
        })?;

        info!(
            "Connected to MongoDB database '{}' at {}",
            config.database,
            config.redacted_url()
        );

        Ok(Self {
            database,
            chunk_size_bytes: config.chunk_size_bytes,
        })
    }

    /// Wrap an existing database handle
    pub fn new(database: Database) -> Self {
        Self {
            database,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }

    /// Override the chunk size used for new uploads
    pub fn with_chunk_size(mut self, chunk_size_bytes: u32) -> Result<Self> {
        validate_chunk_size(chunk_size_bytes)?;
        self.chunk_size_bytes = chunk_size_bytes;
        Ok(self)
    }

    pub fn chunk_size_bytes(&self) -> u32 {
        self.chunk_size_bytes
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn gridfs_bucket(&self, name: &str) -> GridFsBucket {
        let mut options = GridFsBucketOptions::default();
        options.bucket_name = Some(name.to_string());
        options.chunk_size_bytes = Some(self.chunk_size_bytes);
        self.database.gridfs_bucket(options)
    }
}

impl BlobStore for GridFsStore {
    fn store_type(&self) -> &'static str {
        "gridfs"
    }

    fn bucket(&self, name: &str) -> Arc<dyn BlobBucket> {
        Arc::new(GridFsSession {
            name: name.to_string(),
            bucket: self.gridfs_bucket(name),
            chunk_size_bytes: self.chunk_size_bytes,
        })
    }
}

/// GridFS bucket handle; records live in `<name>.files` / `<name>.chunks`
struct GridFsSession {
    name: String,
    bucket: GridFsBucket,
    chunk_size_bytes: u32,
}

impl GridFsSession {
    fn stored_blob(&self, file: FilesCollectionDocument) -> StoredBlob {
        StoredBlob {
            id: file.id,
            bucket: self.name.clone(),
            filename: file.filename.unwrap_or_default(),
            length: file.length,
            chunk_size_bytes: file.chunk_size_bytes,
            upload_date: file.upload_date.to_chrono(),
            metadata: file.metadata,
        }
    }

    /// Remove chunks of an upload that will never be committed
    async fn abort_quietly(&self, upload: &mut GridFsUploadStream, filename: &str) {
        if let Err(abort_err) = upload.abort().await {
            warn!(
                "Failed to abort GridFS upload {}/{}: {}",
                self.name, filename, abort_err
            );
        }
    }
}

/// Record for a committed upload whose files document could not be re-read
fn committed_blob(
    bucket: &str,
    id: Bson,
    filename: &str,
    length: u64,
    chunk_size_bytes: u32,
    metadata: Option<Document>,
) -> StoredBlob {
    StoredBlob {
        id,
        bucket: bucket.to_string(),
        filename: filename.to_string(),
        length,
        chunk_size_bytes,
        upload_date: Utc::now(),
        metadata,
    }
}

#[async_trait]
impl BlobBucket for GridFsSession {
    async fn upload(
        &self,
        filename: &str,
        metadata: Option<Document>,
        content: &mut dyn BlobSource,
    ) -> Result<StoredBlob> {
        let mut open = self.bucket.open_upload_stream(filename);
        if let Some(metadata) = metadata.clone() {
            open = open.metadata(metadata);
        }
        let mut upload = open.await?;
        let id = upload.id().clone();

        let copied = match futures::io::copy((&mut *content).compat(), &mut upload).await {
            Ok(copied) => copied,
            Err(e) => {
                // Drop the chunks written so far; the files document is only
                // inserted on close, so nothing else is visible yet
                self.abort_quietly(&mut upload, filename).await;
                return Err(BlobError::storage_failure(format!(
                    "Failed to stream {}/{}: {}",
                    self.name, filename, e
                )));
            }
        };

        if let Err(e) = upload.close().await {
            // Final chunks may already be flushed
            self.abort_quietly(&mut upload, filename).await;
            return Err(BlobError::storage_failure(format!(
                "Failed to commit {}/{}: {}",
                self.name, filename, e
            )));
        }

        debug!("GridFS committed {}/{} ({} bytes)", self.name, filename, copied);

        // The blob is stored at this point; a failed re-read must not turn
        // into an error the caller would retry into a duplicate
        match self.bucket.find_one(doc! { "_id": id.clone() }).await {
            Ok(Some(file)) => Ok(self.stored_blob(file)),
            Ok(None) => {
                warn!(
                    "Committed file {} missing from {}.files, returning upload record",
                    id, self.name
                );
                Ok(committed_blob(
                    &self.name,
                    id,
                    filename,
                    copied,
                    self.chunk_size_bytes,
                    metadata,
                ))
            }
            Err(e) => {
                warn!(
                    "Failed to re-read committed file {} in {}: {}",
                    id, self.name, e
                );
                Ok(committed_blob(
                    &self.name,
                    id,
                    filename,
                    copied,
                    self.chunk_size_bytes,
                    metadata,
                ))
            }
        }
    }

    async fn find_one(&self, filename: &str) -> Result<Option<StoredBlob>> {
        let file = self
            .bucket
            .find_one(doc! { "filename": filename })
            .await?;
        Ok(file.map(|file| self.stored_blob(file)))
    }

    async fn open(&self, blob: &StoredBlob) -> Result<BlobReader> {
        let download = self.bucket.open_download_stream(blob.id.clone()).await?;
        Ok(BlobReader::new(blob.clone(), download.compat()))
    }
}
