//! ops_worker_rust - live price ingestion for the fund ops tick pipeline.
//!
//! Maintains a streaming subscription to the market data feed, keeps the
//! latest tick per instrument in memory, flushes that state into
//! `market.ticks_v1` on a fixed period, and watches for silent feed stalls.

pub mod cache;
pub mod config;
pub mod feed;
pub mod flush;
pub mod watchdog;
pub mod worker;

pub use config::OpsWorkerConfig;
pub use worker::OpsWorker;
