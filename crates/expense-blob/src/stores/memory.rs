//! Process-local blob store

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use bytes::Bytes;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BlobBucket, BlobReader, BlobSource, BlobStore, StoredBlob};
use crate::error::{BlobError, Result};
use crate::services::config::DEFAULT_CHUNK_SIZE_BYTES;

struct MemoryRecord {
    blob: StoredBlob,
    content: Bytes,
}

type Buckets = Arc<RwLock<HashMap<String, Vec<MemoryRecord>>>>;

/// In-memory store with GridFS semantics: append-only buckets, duplicate
/// filenames allowed, lookups return the oldest match.
#[derive(Clone, Default)]
pub struct MemoryStore {
    buckets: Buckets,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored in a bucket
    pub async fn record_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl BlobStore for MemoryStore {
    fn store_type(&self) -> &'static str {
        "memory"
    }

    fn bucket(&self, name: &str) -> Arc<dyn BlobBucket> {
        Arc::new(MemoryBucket {
            name: name.to_string(),
            buckets: self.buckets.clone(),
        })
    }
}

struct MemoryBucket {
    name: String,
    buckets: Buckets,
}

#[async_trait]
impl BlobBucket for MemoryBucket {
    async fn upload(
        &self,
        filename: &str,
        metadata: Option<Document>,
        content: &mut dyn BlobSource,
    ) -> Result<StoredBlob> {
        // Buffer fully before touching the map so a failed read stores nothing
        let mut buf = Vec::new();
        content.read_to_end(&mut buf).await?;

        let blob = StoredBlob {
            id: Bson::ObjectId(ObjectId::new()),
            bucket: self.name.clone(),
            filename: filename.to_string(),
            length: buf.len() as u64,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            upload_date: Utc::now(),
            metadata,
        };

        debug!("memory PUT {}/{} ({} bytes)", self.name, filename, blob.length);

        self.buckets
            .write()
            .await
            .entry(self.name.clone())
            .or_default()
            .push(MemoryRecord {
                blob: blob.clone(),
                content: Bytes::from(buf),
            });

        Ok(blob)
    }

    async fn find_one(&self, filename: &str) -> Result<Option<StoredBlob>> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(&self.name).and_then(|records| {
            records
                .iter()
                .find(|record| record.blob.filename == filename)
                .map(|record| record.blob.clone())
        }))
    }

    async fn open(&self, blob: &StoredBlob) -> Result<BlobReader> {
        let buckets = self.buckets.read().await;
        let content = buckets
            .get(&self.name)
            .and_then(|records| records.iter().find(|record| record.blob.id == blob.id))
            .map(|record| record.content.clone())
            .ok_or_else(|| BlobError::not_found(&self.name, &blob.filename))?;

        Ok(BlobReader::new(blob.clone(), Cursor::new(content)))
    }
}
