//! Configuration for portfolio_sync_rust

use anyhow::{anyhow, Result};
use fundops_core::SymbolMap;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Postgres connection string (required)
    pub database_url: String,

    /// Feed-local -> canonical identifier mapping
    pub symbols: SymbolMap,

    /// Period between sync cycles
    pub sync_interval: Duration,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL must be set"))?;

        let symbols = SymbolMap::from_env_or_builtin()?;

        let sync_interval_secs = parse_u64("SYNC_INTERVAL_SECS", 10)?;
        if sync_interval_secs == 0 {
            return Err(anyhow!("SYNC_INTERVAL_SECS must be > 0"));
        }

        Ok(Self {
            database_url,
            symbols,
            sync_interval: Duration::from_secs(sync_interval_secs),
        })
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
