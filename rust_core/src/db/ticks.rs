//! Tick persistence operations.
//!
//! `market.ticks_v1` holds one logical row per feed-local instrument and is
//! mutated forever; `market.ticks_raw_v1` is append-only in the canonical
//! namespace with PK `(symbol_id, event_ts)`. Both write paths express their
//! conflict policy directly in SQL: a single conditional upsert guarded by
//! event time, and an idempotent insert.

use crate::types::{CanonicalSymbolId, FeedSymbolId, PositionMarketValue, Tick, TickRow};
use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::debug;

/// Upsert the latest tick for one feed-local instrument.
///
/// The write only applies when the incoming `event_ts` is strictly newer
/// than the stored one, so late or duplicate deliveries can never regress
/// the row. Returns whether a row was actually written.
pub async fn upsert_tick(pool: &PgPool, symbol_id: FeedSymbolId, tick: &Tick) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO market.ticks_v1
            (symbol_id, event_ts, last_price, last_size, created_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (symbol_id) DO UPDATE
        SET event_ts   = EXCLUDED.event_ts,
            last_price = EXCLUDED.last_price,
            last_size  = EXCLUDED.last_size,
            created_at = now()
        WHERE ticks_v1.event_ts < EXCLUDED.event_ts
        "#,
    )
    .bind(symbol_id)
    .bind(tick.event_ts)
    .bind(tick.price)
    .bind(tick.size)
    .execute(pool)
    .await
    .context("Failed to upsert tick")?;

    let written = result.rows_affected() > 0;
    if !written {
        debug!("Upsert for {} skipped: stored event_ts is newer", symbol_id);
    }
    Ok(written)
}

/// Read the latest tick per feed-local instrument.
pub async fn fetch_ticks(pool: &PgPool) -> Result<Vec<TickRow>> {
    sqlx::query_as::<_, TickRow>(
        "SELECT symbol_id, event_ts, last_price, last_size FROM market.ticks_v1",
    )
    .fetch_all(pool)
    .await
    .context("Failed to fetch ticks")
}

/// Forward one primary tick row into the canonical raw tick table.
///
/// Re-delivery of an already-seen `(symbol_id, event_ts)` pair is a no-op.
/// Returns whether a new row was inserted.
pub async fn forward_tick(
    pool: &PgPool,
    canonical_id: CanonicalSymbolId,
    row: &TickRow,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO market.ticks_raw_v1
            (symbol_id, event_ts, last_price, last_size, created_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (symbol_id, event_ts) DO NOTHING
        "#,
    )
    .bind(canonical_id)
    .bind(row.event_ts)
    .bind(row.last_price)
    .bind(row.last_size)
    .execute(pool)
    .await
    .context("Failed to forward tick")?;

    Ok(result.rows_affected() > 0)
}

/// Read the derived portfolio valuation view (diagnostic only).
pub async fn fetch_position_market_values(pool: &PgPool) -> Result<Vec<PositionMarketValue>> {
    sqlx::query_as::<_, PositionMarketValue>(
        r#"
        SELECT fund_id, symbol_id, qty, last_price, market_value,
               unrealized_pnl, total_pnl
        FROM portfolio.position_market_value_v1
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to fetch position market values")
}
