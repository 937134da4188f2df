use anyhow::Result;
use dotenv::dotenv;
use log::info;
use portfolio_sync_rust::{PortfolioSyncWorker, SyncConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting portfolio_sync_rust...");

    let config = SyncConfig::from_env()?;
    let worker = PortfolioSyncWorker::new(config).await?;

    worker.run().await
}
