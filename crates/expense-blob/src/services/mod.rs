//! Blob facade and store configuration

mod blob_facade;
pub(crate) mod config;

pub use blob_facade::BlobFacade;
pub use config::{
    GridFsConfig, GridFsInputConfig, DEFAULT_CHUNK_SIZE_BYTES, DEFAULT_DATABASE,
    DEFAULT_MONGODB_URL, MAX_CHUNK_SIZE_BYTES,
};
