//! expense-blob: Receipt and attachment storage for the expense platform
//!
//! Stores binary blobs under a `(bucket, filename)` pair with an optional
//! metadata document. The heavy lifting (chunking, checksums, consistency)
//! is done by the backing store; MongoDB GridFS in production, an in-memory
//! store for tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use expense_blob::{BlobFacade, GridFsConfig, GridFsStore};
//! use mongodb::bson::doc;
//!
//! # async fn example() -> expense_blob::Result<()> {
//! let store = GridFsStore::connect(&GridFsConfig::default()).await?;
//! let blobs = BlobFacade::new(Arc::new(store));
//!
//! let receipt: &[u8] = b"\x89PNG...";
//! let stored = blobs
//!     .write("receipts", Some(receipt), "r123.png", Some(doc! { "userId": "42" }))
//!     .await?;
//!
//! let bytes = blobs.read_bytes("receipts", &stored.filename).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod metadata;
pub mod services;
pub mod stores;

pub use error::{BlobError, Result};
pub use metadata::metadata_from_json;
pub use services::{BlobFacade, GridFsConfig, GridFsInputConfig};
pub use stores::{
    BlobBucket, BlobReader, BlobSource, BlobStore, GridFsStore, MemoryStore, StoredBlob,
};
