//! The sync cycle: translate, forward, observe.
//!
//! Each cycle reads every row of `market.ticks_v1`, resolves the feed-local
//! ids through the instrument mapping, appends the mapped rows into
//! `market.ticks_raw_v1` (idempotently), then logs the portfolio valuation
//! view. The observe phase is independent of the forward phase: its failure
//! never rolls anything back. A failure anywhere in the cycle is logged and
//! the loop waits for the next interval - there is no retry inside a cycle.

use crate::config::SyncConfig;
use anyhow::Result;
use fundops_core::db::ticks::{fetch_position_market_values, fetch_ticks, forward_tick};
use fundops_core::db::{create_pool, DbPoolConfig};
use fundops_core::{CanonicalSymbolId, FeedSymbolId, PositionMarketValue, SymbolMap, TickRow};
use log::{error, info, warn};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Translation result for one cycle's batch of primary tick rows.
#[derive(Debug, Default)]
pub struct ForwardPlan {
    /// Rows with a canonical identity, ready to insert.
    pub mapped: Vec<(CanonicalSymbolId, TickRow)>,
    /// Feed ids with no mapping entry; skipped, never fatal.
    pub unmapped: Vec<FeedSymbolId>,
}

/// Resolve each row's feed-local symbol id to its canonical counterpart.
pub fn plan_forward(rows: Vec<TickRow>, symbols: &SymbolMap) -> ForwardPlan {
    let mut plan = ForwardPlan::default();
    for row in rows {
        match symbols.canonical_id(row.symbol_id) {
            Some(canonical) => plan.mapped.push((canonical, row)),
            None => plan.unmapped.push(row.symbol_id),
        }
    }
    plan
}

pub struct PortfolioSyncWorker {
    config: SyncConfig,
    pool: PgPool,
}

impl PortfolioSyncWorker {
    pub async fn new(config: SyncConfig) -> Result<Self> {
        let pool = create_pool(&config.database_url, &DbPoolConfig::from_env()).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        info!("Connected to database");

        Ok(Self { config, pool })
    }

    /// Run forever on the configured period. Cycle errors are logged and the
    /// next cycle proceeds on schedule.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Sync loop started (interval={}s, {} instrument(s) mapped)",
            self.config.sync_interval.as_secs(),
            self.config.symbols.len()
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                error!("Cycle error: {}", e);
            }
            tokio::time::sleep(self.config.sync_interval).await;
        }
    }

    /// One translate-forward-observe cycle.
    pub async fn run_cycle(&self) -> Result<()> {
        let ticks = fetch_ticks(&self.pool).await?;
        if ticks.is_empty() {
            info!("No ticks available.");
            return Ok(());
        }

        let total = ticks.len();
        let plan = plan_forward(ticks, &self.config.symbols);

        for feed_id in &plan.unmapped {
            warn!("No symbol mapping for tick symbol_id={}", feed_id);
        }

        let mut inserted = 0;
        for (canonical, row) in &plan.mapped {
            match forward_tick(&self.pool, *canonical, row).await {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Forward failed for {}: {}", row.symbol_id, e);
                }
            }
        }

        info!(
            "Forwarded {} of {} tick(s) -> ticks_raw_v1 ({} new row(s))",
            plan.mapped.len(),
            total,
            inserted
        );

        self.log_portfolio().await;
        Ok(())
    }

    /// Read the valuation view and emit one line per position. Errors stay
    /// inside this phase.
    async fn log_portfolio(&self) {
        match fetch_position_market_values(&self.pool).await {
            Ok(rows) if rows.is_empty() => {
                info!("portfolio.position_market_value_v1 - no rows");
            }
            Ok(rows) => {
                for r in &rows {
                    log_position(r);
                }
            }
            Err(e) => {
                warn!("Portfolio read failed: {}", e);
            }
        }
    }
}

fn log_position(r: &PositionMarketValue) {
    info!(
        "fund={} sym={} | qty={} price={} mv={} upnl={} total_pnl={}",
        short_id(&r.fund_id),
        short_id(&r.symbol_id.0),
        r.qty,
        fmt_opt(&r.last_price),
        fmt_opt_2dp(&r.market_value),
        fmt_opt_2dp(&r.unrealized_pnl),
        fmt_opt_2dp(&r.total_pnl),
    );
}

/// First UUID group, enough to identify a row in logs.
fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn fmt_opt(value: &Option<Decimal>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn fmt_opt_2dp(value: &Option<Decimal>) -> String {
    match value {
        Some(v) => v.round_dp(2).to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tick_row(symbol_id: FeedSymbolId, price: i64) -> TickRow {
        TickRow {
            symbol_id,
            event_ts: Utc::now(),
            last_price: Decimal::from(price),
            last_size: Decimal::ZERO,
        }
    }

    #[test]
    fn test_plan_forward_resolves_mapped_rows() {
        let symbols = SymbolMap::builtin();
        let btc = symbols.feed_id("bitcoin").unwrap();
        let eth = symbols.feed_id("ethereum").unwrap();

        let plan = plan_forward(vec![tick_row(btc, 50000), tick_row(eth, 4000)], &symbols);

        assert_eq!(plan.mapped.len(), 2);
        assert!(plan.unmapped.is_empty());
        assert_eq!(plan.mapped[0].0, symbols.canonical_id(btc).unwrap());
        assert_eq!(plan.mapped[1].0, symbols.canonical_id(eth).unwrap());
    }

    #[test]
    fn test_plan_forward_skips_unmapped_rows() {
        // A foreign row in ticks_v1 (written by some other feed) must be
        // skipped, not forwarded and not an error.
        let symbols = SymbolMap::builtin();
        let btc = symbols.feed_id("bitcoin").unwrap();
        let foreign: FeedSymbolId = "99999999-9999-9999-9999-999999999999".parse().unwrap();

        let plan = plan_forward(vec![tick_row(btc, 50000), tick_row(foreign, 1)], &symbols);

        assert_eq!(plan.mapped.len(), 1);
        assert_eq!(plan.unmapped, vec![foreign]);
    }

    #[test]
    fn test_short_id() {
        let id: Uuid = "d85b4396-20a5-4f47-91fa-d83b802734b5".parse().unwrap();
        assert_eq!(short_id(&id), "d85b4396");
    }

    #[test]
    fn test_fmt_opt_2dp_rounds() {
        let v = Some("1234.5678".parse::<Decimal>().unwrap());
        assert_eq!(fmt_opt_2dp(&v), "1234.57");
        assert_eq!(fmt_opt_2dp(&None), "-");
    }
}
