//! Fund ops core - shared types and persistence for the market tick pipeline.
//!
//! This crate provides:
//! - Typed feed-local and canonical instrument identifiers
//! - The static instrument identifier mapping with load-time validation
//! - Database pool construction with a small fixed capacity
//! - Tick persistence: monotonic upsert into `market.ticks_v1`, idempotent
//!   forwarding into `market.ticks_raw_v1`, and the read-only portfolio
//!   valuation query

mod types;

pub mod db;
pub mod symbols;

pub use symbols::{Instrument, SymbolMap, SymbolMapError};
pub use types::*;
