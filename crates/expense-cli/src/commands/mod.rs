pub mod get;
pub mod put;
pub mod stat;

pub use get::GetCommand;
pub use put::PutCommand;
pub use stat::StatCommand;

use std::sync::Arc;

use clap::Args;
use expense_blob::{BlobFacade, GridFsConfig, GridFsInputConfig, GridFsStore};
use tracing::debug;

/// Connection settings shared by every command, accepted before or after it
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// MongoDB connection URL
    #[arg(long, env = "EXPENSE_MONGODB_URL", global = true)]
    pub mongodb_url: Option<String>,

    /// Database holding the GridFS buckets
    #[arg(long, env = "EXPENSE_MONGODB_DATABASE", global = true)]
    pub database: Option<String>,

    /// Chunk size in bytes for new uploads
    #[arg(long, env = "EXPENSE_GRIDFS_CHUNK_SIZE", global = true)]
    pub chunk_size: Option<u32>,
}

impl StoreArgs {
    pub fn config(&self) -> GridFsConfig {
        GridFsInputConfig {
            url: self.mongodb_url.clone(),
            database: self.database.clone(),
            chunk_size_bytes: self.chunk_size,
        }
        .into()
    }

    pub async fn connect(&self) -> anyhow::Result<BlobFacade> {
        let config = self.config();
        debug!(
            "Connecting to {} (database {})",
            config.redacted_url(),
            config.database
        );
        let store = GridFsStore::connect(&config).await?;
        Ok(BlobFacade::new(Arc::new(store)))
    }
}
