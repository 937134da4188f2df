//! Staleness watchdog and the reconnect signal.
//!
//! The transport layer alone cannot detect a connected-but-silent feed, so
//! the watchdog compares per-instrument tick ages against a threshold and
//! raises the reconnect signal when any subscribed instrument has gone
//! quiet. The connector consumes the signal at its next message boundary.

use crate::cache::TickCache;
use chrono::{DateTime, Utc};
use fundops_core::{FeedSymbolId, Tick};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::interval;

/// Cooperative reconnect request from the watchdog to the feed connector.
///
/// `raise` is at-least-once: the latch stays set until the connector clears
/// it at the start of a fresh session, and a wakeup permit is stored for a
/// connector that is not currently waiting. Consumers treat a wakeup with a
/// clear latch as spurious, so duplicate raises are harmless.
#[derive(Default)]
pub struct ReconnectSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl ReconnectSignal {
    pub fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Wait until the signal is raised.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Find the first subscribed instrument whose tick is older than `threshold`
/// at time `now`. A never-seen instrument counts as infinitely stale. The
/// age is `None` for never-seen instruments.
pub fn first_stale(
    snapshot: &HashMap<FeedSymbolId, Tick>,
    subscribed: &[FeedSymbolId],
    threshold: Duration,
    now: DateTime<Utc>,
) -> Option<(FeedSymbolId, Option<Duration>)> {
    for feed_id in subscribed {
        match snapshot.get(feed_id) {
            None => return Some((*feed_id, None)),
            Some(tick) if tick.is_stale(threshold, now) => {
                let age = now
                    .signed_duration_since(tick.event_ts)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                return Some((*feed_id, Some(age)));
            }
            Some(_) => {}
        }
    }
    None
}

pub struct StalenessWatchdog {
    cache: TickCache,
    signal: Arc<ReconnectSignal>,
    subscribed: Vec<FeedSymbolId>,
    stale_threshold: Duration,
    check_interval: Duration,
}

impl StalenessWatchdog {
    pub fn new(
        cache: TickCache,
        signal: Arc<ReconnectSignal>,
        subscribed: Vec<FeedSymbolId>,
        stale_threshold: Duration,
        check_interval: Duration,
    ) -> Self {
        Self {
            cache,
            signal,
            subscribed,
            stale_threshold,
            check_interval,
        }
    }

    /// Run forever: grace period, then periodic staleness checks.
    pub async fn run(self) {
        info!(
            "Watchdog started: threshold={}s, interval={}s, {} instrument(s), grace={}s",
            self.stale_threshold.as_secs(),
            self.check_interval.as_secs(),
            self.subscribed.len(),
            self.stale_threshold.as_secs()
        );

        // Grace period so the first subscription has time to deliver before
        // never-seen instruments count as stale.
        tokio::time::sleep(self.stale_threshold).await;

        let mut ticker = interval(self.check_interval);
        loop {
            ticker.tick().await;
            self.check_once(Utc::now()).await;
        }
    }

    /// One staleness sweep. Raises the reconnect signal at most once per
    /// sweep: one stale instrument already forces a full reconnect.
    pub async fn check_once(&self, now: DateTime<Utc>) -> bool {
        let snapshot = self.cache.snapshot().await;

        match first_stale(&snapshot, &self.subscribed, self.stale_threshold, now) {
            Some((feed_id, Some(age))) => {
                warn!(
                    "Instrument {} silent for {}s (threshold {}s), raising reconnect",
                    feed_id,
                    age.as_secs(),
                    self.stale_threshold.as_secs()
                );
                self.signal.raise();
                true
            }
            Some((feed_id, None)) => {
                warn!(
                    "Instrument {} has never ticked, raising reconnect",
                    feed_id
                );
                self.signal.raise();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    const BTC: &str = "22222222-2222-2222-2222-222222222222";
    const ETH: &str = "33333333-3333-3333-3333-333333333333";
    const SOL: &str = "44444444-4444-4444-4444-444444444444";

    fn feed_id(s: &str) -> FeedSymbolId {
        s.parse().unwrap()
    }

    fn tick_at(ts: DateTime<Utc>) -> Tick {
        Tick::new(Decimal::from(50000), Decimal::ZERO, ts)
    }

    #[test]
    fn test_never_seen_instrument_is_stale() {
        let snapshot = HashMap::new();
        let stale = first_stale(
            &snapshot,
            &[feed_id(BTC)],
            Duration::from_secs(30),
            Utc::now(),
        );
        assert_eq!(stale, Some((feed_id(BTC), None)));
    }

    #[test]
    fn test_fresh_instruments_are_not_stale() {
        let now = Utc::now();
        let mut snapshot = HashMap::new();
        snapshot.insert(feed_id(BTC), tick_at(now));
        snapshot.insert(feed_id(ETH), tick_at(now - chrono::Duration::seconds(10)));

        let stale = first_stale(
            &snapshot,
            &[feed_id(BTC), feed_id(ETH)],
            Duration::from_secs(30),
            now,
        );
        assert_eq!(stale, None);
    }

    #[test]
    fn test_one_stale_among_three_is_reported_once() {
        let now = Utc::now();
        let mut snapshot = HashMap::new();
        snapshot.insert(feed_id(BTC), tick_at(now));
        snapshot.insert(feed_id(ETH), tick_at(now - chrono::Duration::seconds(45)));
        snapshot.insert(feed_id(SOL), tick_at(now));

        let stale = first_stale(
            &snapshot,
            &[feed_id(BTC), feed_id(ETH), feed_id(SOL)],
            Duration::from_secs(30),
            now,
        );
        let (who, age) = stale.unwrap();
        assert_eq!(who, feed_id(ETH));
        assert_eq!(age.unwrap().as_secs(), 45);
    }

    #[tokio::test]
    async fn test_watchdog_raises_signal_once_per_sweep() {
        let cache = TickCache::new();
        let now = Utc::now();

        // Two instruments stale at once, one fresh.
        cache
            .update(feed_id(BTC), Decimal::from(50000), Decimal::ZERO, now)
            .await;
        cache
            .update(
                feed_id(ETH),
                Decimal::from(4000),
                Decimal::ZERO,
                now - chrono::Duration::seconds(60),
            )
            .await;

        let signal = Arc::new(ReconnectSignal::new());
        let watchdog = StalenessWatchdog::new(
            cache,
            signal.clone(),
            vec![feed_id(BTC), feed_id(ETH), feed_id(SOL)],
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        assert!(watchdog.check_once(now).await);
        assert!(signal.is_set());

        // A second sweep raises again (at-least-once), still idempotent for
        // the consumer.
        assert!(watchdog.check_once(now).await);
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn test_watchdog_quiet_when_all_fresh() {
        let cache = TickCache::new();
        let now = Utc::now();
        cache
            .update(feed_id(BTC), Decimal::from(50000), Decimal::ZERO, now)
            .await;

        let signal = Arc::new(ReconnectSignal::new());
        let watchdog = StalenessWatchdog::new(
            cache,
            signal.clone(),
            vec![feed_id(BTC)],
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        assert!(!watchdog.check_once(now).await);
        assert!(!signal.is_set());
    }

    #[tokio::test]
    async fn test_signal_raise_clear_cycle() {
        let signal = ReconnectSignal::new();
        assert!(!signal.is_set());

        signal.raise();
        assert!(signal.is_set());
        signal.raise();
        assert!(signal.is_set());

        // What the connector does at the start of a fresh session.
        signal.clear();
        assert!(!signal.is_set());
    }

    #[tokio::test]
    async fn test_signal_wakes_a_waiter() {
        let signal = Arc::new(ReconnectSignal::new());

        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move {
                signal.notified().await;
                signal.is_set()
            })
        };

        // Give the waiter a chance to park before raising.
        tokio::task::yield_now().await;
        signal.raise();

        let was_set = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
        assert!(was_set);
    }
}
