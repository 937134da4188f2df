//! Periodic cache flush into `market.ticks_v1`.
//!
//! Each cycle snapshots the cache and upserts every instrument through the
//! monotonic event-time guard. A write failure for one instrument is logged
//! and does not abort the cycle for the remaining instruments.

use crate::cache::TickCache;
use fundops_core::db::ticks::upsert_tick;
use log::{debug, error, info};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

pub struct FlushScheduler {
    pool: PgPool,
    cache: TickCache,
    flush_interval: Duration,
}

impl FlushScheduler {
    pub fn new(pool: PgPool, cache: TickCache, flush_interval: Duration) -> Self {
        Self {
            pool,
            cache,
            flush_interval,
        }
    }

    /// Run forever, flushing on a fixed period.
    pub async fn run(self) {
        info!(
            "Flush scheduler started (interval={}s)",
            self.flush_interval.as_secs()
        );

        let mut ticker = interval(self.flush_interval);
        loop {
            ticker.tick().await;
            self.flush_once().await;
        }
    }

    /// Flush one snapshot. Returns how many rows were actually written.
    pub async fn flush_once(&self) -> usize {
        let snapshot = self.cache.snapshot().await;
        if snapshot.is_empty() {
            return 0;
        }

        let attempted = snapshot.len();
        let mut written = 0;
        for (feed_id, tick) in snapshot {
            match upsert_tick(&self.pool, feed_id, &tick).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Tick write failed for {}: {}", feed_id, e);
                }
            }
        }

        debug!("Flushed {}/{} tick(s)", written, attempted);
        written
    }
}
