//! In-memory tick cache.
//!
//! Single-writer, multi-reader: only the feed connector's message handler
//! mutates it; the flusher and the watchdog read snapshots. The cache always
//! reflects the most recently *received* message per instrument - event-time
//! ordering is enforced at the persistence layer, not here.

use chrono::{DateTime, Utc};
use fundops_core::{FeedSymbolId, Tick};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct TickCache {
    ticks: Arc<RwLock<HashMap<FeedSymbolId, Tick>>>,
    ticks_received: Arc<AtomicU64>,
}

impl TickCache {
    pub fn new() -> Self {
        Self {
            ticks: Arc::new(RwLock::new(HashMap::new())),
            ticks_received: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Unconditionally overwrite the entry for one instrument.
    pub async fn update(
        &self,
        feed_id: FeedSymbolId,
        price: Decimal,
        size: Decimal,
        event_ts: DateTime<Utc>,
    ) {
        let tick = Tick::new(price, size, event_ts);
        {
            let mut ticks = self.ticks.write().await;
            ticks.insert(feed_id, tick);
        }
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all entries.
    pub async fn snapshot(&self) -> HashMap<FeedSymbolId, Tick> {
        self.ticks.read().await.clone()
    }

    /// Total updates received since startup.
    pub fn received_total(&self) -> u64 {
        self.ticks_received.load(Ordering::Relaxed)
    }
}
