//! Backing store capability and its implementations
//!
//! A [`BlobStore`] hands out bucket-scoped [`BlobBucket`] sessions. Each
//! session can upload a named blob with optional metadata, look up the first
//! record for a filename, and open a reader over a stored record.

mod gridfs;
mod memory;

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bson::{Bson, Document};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::Result;

pub use gridfs::GridFsStore;
pub use memory::MemoryStore;

/// Record describing a stored blob, as returned by the backing store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBlob {
    /// Store-assigned identifier
    pub id: Bson,
    /// Bucket the blob lives in
    pub bucket: String,
    /// Filename the blob was written under
    pub filename: String,
    /// Size in bytes
    pub length: u64,
    /// Chunk size used when the blob was written
    pub chunk_size_bytes: u32,
    /// Commit timestamp
    pub upload_date: DateTime<Utc>,
    /// Optional metadata document attached on write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Document>,
}

/// Entry point to a backing store
pub trait BlobStore: Send + Sync {
    /// Short name of the backend, used in logs
    fn store_type(&self) -> &'static str;

    /// Begin an operation scoped to the named bucket.
    ///
    /// Buckets are not validated or created here; a bucket comes into
    /// existence with its first upload.
    fn bucket(&self, name: &str) -> Arc<dyn BlobBucket>;
}

/// Operations available inside a single bucket
#[async_trait]
pub trait BlobBucket: Send + Sync {
    /// Stream `content` into a new record named `filename` and commit it.
    ///
    /// Always creates a new record, even if `filename` already exists.
    /// A failed upload leaves no visible record behind.
    async fn upload(
        &self,
        filename: &str,
        metadata: Option<Document>,
        content: &mut dyn BlobSource,
    ) -> Result<StoredBlob>;

    /// First record stored under `filename`, in natural (insertion) order
    async fn find_one(&self, filename: &str) -> Result<Option<StoredBlob>>;

    /// Open a reader over a record previously returned by this bucket
    async fn open(&self, blob: &StoredBlob) -> Result<BlobReader>;
}

/// Byte source consumed by an upload.
///
/// `close` releases whatever the source holds once the upload is over;
/// sources that release on drop can rely on the default.
#[async_trait]
pub trait BlobSource: AsyncRead + Send + Unpin {
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl BlobSource for tokio::fs::File {
    async fn close(&mut self) -> io::Result<()> {
        // Waits for any in-flight operation on the file before it is dropped
        tokio::io::AsyncWriteExt::flush(self).await
    }
}

impl<T> BlobSource for io::Cursor<T> where T: AsRef<[u8]> + Send + Unpin {}

impl<'a> BlobSource for &'a [u8] {}

impl<S, B, E> BlobSource for StreamReader<S, B>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin,
    B: bytes::Buf + Send + Unpin,
    E: Into<io::Error>,
{
}

#[async_trait]
impl BlobSource for Box<dyn BlobSource> {
    async fn close(&mut self) -> io::Result<()> {
        (**self).close().await
    }
}

/// Reader over the content of a stored blob.
///
/// Dropping the reader releases the underlying store cursor.
pub struct BlobReader {
    blob: StoredBlob,
    inner: Pin<Box<dyn AsyncRead + Send>>,
}

impl BlobReader {
    pub fn new(blob: StoredBlob, inner: impl AsyncRead + Send + 'static) -> Self {
        Self {
            blob,
            inner: Box::pin(inner),
        }
    }

    /// Record this reader was opened from
    pub fn blob(&self) -> &StoredBlob {
        &self.blob
    }

    /// Convert into a stream of byte chunks
    pub fn into_stream(self) -> ReaderStream<Self> {
        ReaderStream::new(self)
    }

    /// Drain the remaining content into memory
    pub async fn read_to_bytes(mut self) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(self.blob.length.min(16 * 1024 * 1024) as usize);
        self.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

impl AsyncRead for BlobReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobReader")
            .field("blob", &self.blob)
            .finish_non_exhaustive()
    }
}
