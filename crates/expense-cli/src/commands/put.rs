use std::path::{Path, PathBuf};

use clap::Args;
use expense_blob::metadata_from_json;
use tracing::info;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct PutCommand {
    /// Bucket to store the file in
    pub bucket: String,

    /// Local file to upload
    pub file: PathBuf,

    /// Stored filename (defaults to the local file name)
    #[arg(long)]
    pub name: Option<String>,

    /// Metadata document as a JSON object, e.g. '{"userId":"42"}'
    #[arg(long)]
    pub metadata: Option<String>,
}

impl PutCommand {
    pub fn execute(self, store: &StoreArgs) -> anyhow::Result<()> {
        let filename = match &self.name {
            Some(name) => name.clone(),
            None => default_name(&self.file)?,
        };

        let metadata = match self.metadata.as_deref() {
            Some(raw) => {
                let value: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| anyhow::anyhow!("Metadata is not valid JSON: {}", e))?;
                Some(metadata_from_json(value)?)
            }
            None => None,
        };

        let rt = tokio::runtime::Runtime::new()?;
        let stored = rt.block_on(async {
            let blobs = store.connect().await?;
            let file = tokio::fs::File::open(&self.file).await.map_err(|e| {
                anyhow::anyhow!("Failed to open {}: {}", self.file.display(), e)
            })?;
            let stored = blobs
                .write(&self.bucket, Some(file), &filename, metadata)
                .await?;
            anyhow::Ok(stored)
        })?;

        info!(
            "Stored {}/{} ({} bytes)",
            stored.bucket, stored.filename, stored.length
        );
        println!("{}", serde_json::to_string_pretty(&stored)?);

        Ok(())
    }
}

fn default_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Cannot derive a name from {}", path.display()))
}
