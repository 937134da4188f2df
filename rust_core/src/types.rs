//! Typed instrument identifiers and tick records.
//!
//! Two UUID namespaces flow through the pipeline and must never be mixed:
//! feed-local sentinel ids (the key of `market.ticks_v1`, assigned per feed
//! asset) and canonical symbol ids (`market.symbols_v1.id`, the key of
//! `market.ticks_raw_v1`). Both get their own newtype so a tick can only be
//! forwarded through an explicit mapping step.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Feed-local instrument identifier: the `symbol_id` of `market.ticks_v1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct FeedSymbolId(pub Uuid);

impl fmt::Display for FeedSymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FeedSymbolId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Canonical instrument identifier: the `symbol_id` of `market.ticks_raw_v1`
/// and of everything downstream of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct CanonicalSymbolId(pub Uuid);

impl fmt::Display for CanonicalSymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CanonicalSymbolId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Latest observed price for one instrument (in-memory only).
///
/// The feed payload carries no event timestamp, so `event_ts` is stamped at
/// receipt; `size` is zero for feeds that do not report trade size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub price: Decimal,
    pub size: Decimal,
    pub event_ts: DateTime<Utc>,
}

impl Tick {
    pub fn new(price: Decimal, size: Decimal, event_ts: DateTime<Utc>) -> Self {
        Self {
            price,
            size,
            event_ts,
        }
    }

    /// Check if this tick is older than `max_age` at time `now`.
    ///
    /// A tick stamped ahead of `now` (feed host clock skew) has age zero.
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let age = now
            .signed_duration_since(self.event_ts)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > max_age
    }
}

/// One row of `market.ticks_v1` (latest tick per feed-local instrument).
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct TickRow {
    pub symbol_id: FeedSymbolId,
    pub event_ts: DateTime<Utc>,
    pub last_price: Decimal,
    pub last_size: Decimal,
}

/// One row of `portfolio.position_market_value_v1` (read-only valuation view).
///
/// The view left-joins latest prices onto open positions, so the price and
/// the derived value columns can be NULL for an instrument that has not
/// ticked yet.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct PositionMarketValue {
    pub fund_id: Uuid,
    pub symbol_id: CanonicalSymbolId,
    pub qty: Decimal,
    pub last_price: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub total_pnl: Option<Decimal>,
}
