//! Configuration for ops_worker_rust

use anyhow::{anyhow, Result};
use fundops_core::SymbolMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpsWorkerConfig {
    /// Postgres connection string (required)
    pub database_url: String,

    /// Streaming feed endpoint; the asset list is appended as a query param
    pub feed_ws_url: String,

    /// Subscribed instruments and their identifier mapping
    pub symbols: SymbolMap,

    /// Period between cache flushes into market.ticks_v1
    pub flush_interval: Duration,

    /// Silence threshold after which an instrument counts as stale
    pub stale_threshold: Duration,

    /// Period between watchdog checks
    pub watchdog_interval: Duration,

    /// Delay before re-dialing the feed after a transport failure
    pub reconnect_delay: Duration,
}

impl OpsWorkerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL must be set"))?;

        let symbols = SymbolMap::from_env_or_builtin()?;

        let flush_interval_secs = parse_u64("FLUSH_INTERVAL_SECS", 5)?;
        let stale_threshold_secs = parse_u64("STALE_THRESHOLD_SECS", 30)?;
        let watchdog_interval_secs = parse_u64("WATCHDOG_INTERVAL_SECS", 5)?;
        let reconnect_delay_secs = parse_u64("FEED_RECONNECT_DELAY_SECS", 3)?;

        if flush_interval_secs == 0 {
            return Err(anyhow!("FLUSH_INTERVAL_SECS must be > 0"));
        }
        if stale_threshold_secs == 0 {
            return Err(anyhow!("STALE_THRESHOLD_SECS must be > 0"));
        }
        if watchdog_interval_secs == 0 {
            return Err(anyhow!("WATCHDOG_INTERVAL_SECS must be > 0"));
        }

        Ok(Self {
            database_url,
            feed_ws_url: env::var("FEED_WS_URL")
                .unwrap_or_else(|_| "wss://ws.coincap.io/prices".to_string()),
            symbols,
            flush_interval: Duration::from_secs(flush_interval_secs),
            stale_threshold: Duration::from_secs(stale_threshold_secs),
            watchdog_interval: Duration::from_secs(watchdog_interval_secs),
            reconnect_delay: Duration::from_secs(reconnect_delay_secs),
        })
    }

    /// Full subscription URL: endpoint plus the configured asset list.
    pub fn subscription_url(&self) -> String {
        format!("{}?assets={}", self.feed_ws_url, self.symbols.assets().join(","))
    }
}

/// Parse environment variable as u64 with default fallback
fn parse_u64(var_name: &str, default: u64) -> Result<u64> {
    match env::var(var_name) {
        Ok(val) => val
            .parse()
            .map_err(|_| anyhow!("{} must be a valid u64", var_name)),
        Err(_) => Ok(default),
    }
}
