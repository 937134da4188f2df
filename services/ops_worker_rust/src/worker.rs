//! OpsWorker: the ingestion process context.
//!
//! Owns the database pool, the tick cache and the reconnect signal, wires
//! the three logical tasks together (feed connector, flush scheduler,
//! staleness watchdog) and tears everything down on shutdown.

use crate::cache::TickCache;
use crate::config::OpsWorkerConfig;
use crate::feed::FeedConnector;
use crate::flush::FlushScheduler;
use crate::watchdog::{ReconnectSignal, StalenessWatchdog};
use anyhow::Result;
use fundops_core::db::{create_pool, DbPoolConfig};
use log::info;
use sqlx::PgPool;
use std::sync::Arc;

pub struct OpsWorker {
    config: OpsWorkerConfig,
    pool: PgPool,
    cache: TickCache,
    signal: Arc<ReconnectSignal>,
}

impl OpsWorker {
    pub async fn new(config: OpsWorkerConfig) -> Result<Self> {
        let pool = create_pool(&config.database_url, &DbPoolConfig::from_env()).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        info!("Connected to database");

        Ok(Self {
            config,
            pool,
            cache: TickCache::new(),
            signal: Arc::new(ReconnectSignal::new()),
        })
    }

    /// Spawn the feed, flush and watchdog tasks, then wait for ctrl-c.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "OpsWorker started: {} instrument(s) on {}",
            self.config.symbols.len(),
            self.config.feed_ws_url
        );

        let feed = FeedConnector::new(
            self.config.subscription_url(),
            self.config.symbols.clone(),
            self.cache.clone(),
            self.signal.clone(),
            self.config.reconnect_delay,
        );
        let feed_task = tokio::spawn(feed.run());

        let flusher = FlushScheduler::new(
            self.pool.clone(),
            self.cache.clone(),
            self.config.flush_interval,
        );
        let flush_task = tokio::spawn(flusher.run());

        let watchdog = StalenessWatchdog::new(
            self.cache.clone(),
            self.signal.clone(),
            self.config.symbols.feed_ids(),
            self.config.stale_threshold,
            self.config.watchdog_interval,
        );
        let watchdog_task = tokio::spawn(watchdog.run());

        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested");

        feed_task.abort();
        flush_task.abort();
        watchdog_task.abort();
        self.pool.close().await;
        info!(
            "OpsWorker stopped ({} tick(s) received this run)",
            self.cache.received_total()
        );

        Ok(())
    }
}
