use std::path::PathBuf;

use clap::Args;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct GetCommand {
    /// Bucket the blob is stored in
    pub bucket: String,

    /// Stored filename
    pub name: String,

    /// Write to this path instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GetCommand {
    pub fn execute(self, store: &StoreArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(async {
            let blobs = store.connect().await?;
            let mut reader = blobs.read(&self.bucket, &self.name).await?;

            let copied = match &self.output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
                        anyhow::anyhow!("Failed to create {}: {}", path.display(), e)
                    })?;
                    let copied = tokio::io::copy(&mut reader, &mut file).await?;
                    file.flush().await?;
                    copied
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    let copied = tokio::io::copy(&mut reader, &mut stdout).await?;
                    stdout.flush().await?;
                    copied
                }
            };

            info!("Read {}/{} ({} bytes)", self.bucket, self.name, copied);
            anyhow::Ok(())
        })
    }
}
