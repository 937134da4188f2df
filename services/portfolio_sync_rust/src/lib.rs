//! portfolio_sync_rust - canonical tick forwarding and portfolio diagnostics.
//!
//! Reads the latest tick per feed-local instrument from `market.ticks_v1`,
//! translates each feed symbol id to its canonical counterpart, appends the
//! result idempotently into `market.ticks_raw_v1`, and logs the derived
//! portfolio valuation view.

pub mod config;
pub mod sync;

pub use config::SyncConfig;
pub use sync::PortfolioSyncWorker;
