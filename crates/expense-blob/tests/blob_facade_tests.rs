use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use expense_blob::{BlobError, BlobFacade, BlobSource, BlobStore, MemoryStore};
use futures::StreamExt;
use mongodb::bson::doc;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

/// Source that records how often it was closed
struct TrackedSource {
    inner: Cursor<Vec<u8>>,
    closes: Arc<AtomicUsize>,
    fail_read: bool,
    fail_close: bool,
}

impl TrackedSource {
    fn new(data: &[u8], closes: Arc<AtomicUsize>) -> Self {
        Self {
            inner: Cursor::new(data.to_vec()),
            closes,
            fail_read: false,
            fail_close: false,
        }
    }
}

impl AsyncRead for TrackedSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.fail_read {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client went away",
            )));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

#[async_trait]
impl BlobSource for TrackedSource {
    async fn close(&mut self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(io::Error::new(io::ErrorKind::Other, "close failed"))
        } else {
            Ok(())
        }
    }
}

fn facade() -> (BlobFacade, MemoryStore) {
    let store = MemoryStore::new();
    (BlobFacade::new(Arc::new(store.clone())), store)
}

fn receipt_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_receipt_scenario() {
    let (blobs, _) = facade();
    let content = receipt_bytes(100);

    let stored = blobs
        .write(
            "receipts",
            Some(Cursor::new(content.clone())),
            "r123.png",
            Some(doc! { "userId": "42" }),
        )
        .await
        .unwrap();

    assert_eq!(stored.filename, "r123.png");
    assert_eq!(stored.bucket, "receipts");
    assert_eq!(stored.length, 100);

    let bytes = blobs.read_bytes("receipts", "r123.png").await.unwrap();
    assert_eq!(bytes.to_vec(), content);
}

#[tokio::test]
async fn test_round_trip_various_sizes() {
    let (blobs, _) = facade();

    for (i, len) in [0usize, 1, 4096, 300 * 1024].into_iter().enumerate() {
        let name = format!("blob-{}.bin", i);
        let content = receipt_bytes(len);

        blobs
            .write("attachments", Some(Cursor::new(content.clone())), &name, None)
            .await
            .unwrap();

        let bytes = blobs.read_bytes("attachments", &name).await.unwrap();
        assert_eq!(bytes.len(), len, "Failed for {}", name);
        assert_eq!(bytes.to_vec(), content, "Failed for {}", name);
    }
}

#[tokio::test]
async fn test_metadata_preserved() {
    let (blobs, _) = facade();
    let metadata = doc! {
        "userId": "42",
        "expenseId": 7_i64,
        "tags": ["taxi", "airport"],
        "approval": { "state": "pending" },
    };

    let content: &[u8] = b"receipt";
    blobs
        .write("receipts", Some(content), "r1.png", Some(metadata.clone()))
        .await
        .unwrap();

    let stored = blobs.stat("receipts", "r1.png").await.unwrap();
    assert_eq!(stored.metadata, Some(metadata));
}

#[tokio::test]
async fn test_absent_metadata_is_omitted() {
    let (blobs, _) = facade();
    let content: &[u8] = b"receipt";

    let stored = blobs
        .write("receipts", Some(content), "r1.png", None)
        .await
        .unwrap();

    assert!(stored.metadata.is_none());
    assert!(blobs.stat("receipts", "r1.png").await.unwrap().metadata.is_none());
}

#[tokio::test]
async fn test_read_missing_is_not_found() {
    let (blobs, _) = facade();

    let err = blobs.read("receipts", "missing.png").await.unwrap_err();
    match err {
        BlobError::NotFound { bucket, filename } => {
            assert_eq!(bucket, "receipts");
            assert_eq!(filename, "missing.png");
        }
        other => panic!("expected NotFound, got {:?}", other),
    }

    assert!(blobs.stat("receipts", "missing.png").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_empty_filename_performs_no_mutation() {
    let (blobs, store) = facade();
    let closes = Arc::new(AtomicUsize::new(0));

    let err = blobs
        .write(
            "receipts",
            Some(TrackedSource::new(b"data", closes.clone())),
            "",
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BlobError::InvalidArgument(_)));
    assert_eq!(store.record_count("receipts").await, 0);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_absent_content_is_invalid_argument() {
    let (blobs, store) = facade();

    let err = blobs
        .write::<TrackedSource>("receipts", None, "r1.png", None)
        .await
        .unwrap_err();

    assert!(matches!(err, BlobError::InvalidArgument(_)));
    assert_eq!(store.record_count("receipts").await, 0);
}

#[tokio::test]
async fn test_duplicate_filenames_create_separate_records() {
    let (blobs, store) = facade();
    let first: &[u8] = b"first upload";
    let second: &[u8] = b"second upload";

    let a = blobs
        .write("receipts", Some(first), "r1.png", None)
        .await
        .unwrap();
    let b = blobs
        .write("receipts", Some(second), "r1.png", None)
        .await
        .unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(store.record_count("receipts").await, 2);

    let bytes = blobs.read_bytes("receipts", "r1.png").await.unwrap();
    assert_eq!(&bytes[..], b"first upload");
}

#[tokio::test]
async fn test_buckets_are_isolated() {
    let (blobs, _) = facade();
    let content: &[u8] = b"avatar";

    blobs
        .write("avatars", Some(content), "me.png", None)
        .await
        .unwrap();

    assert!(blobs.read("receipts", "me.png").await.unwrap_err().is_not_found());
    assert!(blobs.read("avatars", "me.png").await.is_ok());
}

#[tokio::test]
async fn test_source_closed_after_success() {
    let (blobs, _) = facade();
    let closes = Arc::new(AtomicUsize::new(0));

    blobs
        .write(
            "receipts",
            Some(TrackedSource::new(b"data", closes.clone())),
            "r1.png",
            None,
        )
        .await
        .unwrap();

    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_source_closed_after_store_failure() {
    let (blobs, store) = facade();
    let closes = Arc::new(AtomicUsize::new(0));
    let mut source = TrackedSource::new(b"data", closes.clone());
    source.fail_read = true;

    let err = blobs
        .write("receipts", Some(source), "r1.png", None)
        .await
        .unwrap_err();

    assert!(err.is_storage_failure());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(store.record_count("receipts").await, 0);
}

#[tokio::test]
async fn test_close_error_does_not_mask_write() {
    let (blobs, _) = facade();
    let closes = Arc::new(AtomicUsize::new(0));
    let mut source = TrackedSource::new(b"data", closes.clone());
    source.fail_close = true;

    let stored = blobs
        .write("receipts", Some(source), "r1.png", None)
        .await
        .unwrap();

    assert_eq!(stored.length, 4);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_file_source_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    let content = receipt_bytes(10_000);

    let mut file = tokio::fs::File::create(&path).await.unwrap();
    file.write_all(&content).await.unwrap();
    file.flush().await.unwrap();
    drop(file);

    let (blobs, _) = facade();
    let source = tokio::fs::File::open(&path).await.unwrap();
    let stored = blobs
        .write("receipts", Some(source), "scan.pdf", None)
        .await
        .unwrap();
    assert_eq!(stored.length, 10_000);

    let reader = blobs.read("receipts", "scan.pdf").await.unwrap();
    assert_eq!(reader.blob().id, stored.id);

    let mut collected = Vec::new();
    let mut stream = reader.into_stream();
    while let Some(chunk) = stream.next().await {
        collected.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(collected, content);
}

#[tokio::test]
async fn test_concurrent_writes_are_independent() {
    let (blobs, store) = facade();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let blobs = blobs.clone();
            tokio::spawn(async move {
                let content = format!("receipt {}", i).into_bytes();
                blobs
                    .write(
                        "receipts",
                        Some(Cursor::new(content)),
                        "shared.txt",
                        Some(doc! { "writer": i }),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.record_count("receipts").await, 8);
}

#[tokio::test]
async fn test_boxed_source() {
    let (blobs, _) = facade();
    let source: Box<dyn BlobSource> = Box::new(Cursor::new(b"boxed".to_vec()));

    blobs
        .write("receipts", Some(source), "boxed.txt", None)
        .await
        .unwrap();

    let bytes = blobs.read_bytes("receipts", "boxed.txt").await.unwrap();
    assert_eq!(&bytes[..], b"boxed");
}

#[test]
fn test_memory_store_type() {
    let store = MemoryStore::new();
    assert_eq!(store.store_type(), "memory");
}
