use anyhow::Result;
use dotenv::dotenv;
use log::info;
use ops_worker_rust::{OpsWorker, OpsWorkerConfig};

// The ingestion tasks are cooperative and share one thread of control; all
// I/O inside them is a suspension point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting ops_worker_rust...");

    let config = OpsWorkerConfig::from_env()?;
    let mut worker = OpsWorker::new(config).await?;

    worker.run().await
}
