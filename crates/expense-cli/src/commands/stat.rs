use clap::Args;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct StatCommand {
    /// Bucket the blob is stored in
    pub bucket: String,

    /// Stored filename
    pub name: String,
}

impl StatCommand {
    pub fn execute(self, store: &StoreArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        let stored = rt.block_on(async {
            let blobs = store.connect().await?;
            anyhow::Ok(blobs.stat(&self.bucket, &self.name).await?)
        })?;

        println!("{}", serde_json::to_string_pretty(&stored)?);
        Ok(())
    }
}
