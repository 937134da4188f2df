//! Streaming feed connector.
//!
//! Holds the websocket session to the price feed and pushes decoded updates
//! into the tick cache. The subscription is carried in the URL (the feed
//! streams a JSON object of asset -> price for the requested assets).
//! Transport failures of any kind are retried forever after a fixed delay;
//! a raised reconnect signal tears the session down at the next message
//! boundary.

use crate::cache::TickCache;
use crate::watchdog::ReconnectSignal;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use fundops_core::SymbolMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub struct FeedConnector {
    url: String,
    symbols: SymbolMap,
    cache: TickCache,
    signal: Arc<ReconnectSignal>,
    reconnect_delay: Duration,
}

impl FeedConnector {
    pub fn new(
        url: String,
        symbols: SymbolMap,
        cache: TickCache,
        signal: Arc<ReconnectSignal>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            url,
            symbols,
            cache,
            signal,
            reconnect_delay,
        }
    }

    /// Run forever: connect, stream, and on any failure or reconnect signal
    /// re-dial after the fixed delay. This is a permanent background task.
    pub async fn run(self) {
        info!("Feed connector starting: {}", self.url);

        loop {
            // A new session supersedes whatever triggered the last teardown.
            self.signal.clear();

            match connect_async(&self.url).await {
                Ok((ws_stream, _)) => {
                    info!("Feed live: {}", self.url);
                    self.session(ws_stream).await;
                }
                Err(e) => {
                    warn!("Feed connect failed: {}", e);
                }
            }

            info!(
                "Reconnecting feed in {}s",
                self.reconnect_delay.as_secs()
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Drive one websocket session until it ends, errors, or the reconnect
    /// signal fires at a message boundary.
    async fn session<S>(&self, mut ws_stream: tokio_tungstenite::WebSocketStream<S>)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        loop {
            tokio::select! {
                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(payload))) => {
                            self.handle_frame(&payload).await;
                        }
                        Some(Ok(Message::Binary(bin))) => {
                            if let Ok(payload) = String::from_utf8(bin) {
                                self.handle_frame(&payload).await;
                            }
                        }
                        Some(Ok(Message::Ping(frame))) => {
                            let _ = ws_stream.send(Message::Pong(frame)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            warn!("Feed closed by server");
                            return;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Feed stream error: {}", e);
                            return;
                        }
                        None => {
                            warn!("Feed stream ended");
                            return;
                        }
                    }
                }
                _ = self.signal.notified() => {
                    // A wakeup with a clear latch is a leftover permit from a
                    // previous session; keep streaming.
                    if self.signal.is_set() {
                        info!("Reconnect signal received, closing feed session");
                        let _ = ws_stream.close(None).await;
                        return;
                    }
                }
            }
        }
    }

    /// Decode one frame and apply every recognized asset to the cache.
    /// Malformed frames and unknown assets are skipped, not errored.
    async fn handle_frame(&self, payload: &str) {
        let Some(prices) = parse_price_map(payload) else {
            debug!("Ignoring non-price frame");
            return;
        };

        let now = Utc::now();
        for (asset, price) in prices {
            match self.symbols.feed_id(&asset) {
                Some(feed_id) => {
                    self.cache.update(feed_id, price, Decimal::ZERO, now).await;
                }
                None => {
                    debug!("Ignoring unsubscribed asset '{}'", asset);
                }
            }
        }
    }
}

/// Parse a feed frame into (asset, price) pairs.
///
/// Frames are JSON objects of asset name to price; prices arrive as strings
/// but numeric values are tolerated. Entries that do not parse as a decimal
/// are dropped. Returns `None` when the frame is not a JSON object at all.
pub fn parse_price_map(payload: &str) -> Option<Vec<(String, Decimal)>> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let map = value.as_object()?;

    let mut out = Vec::with_capacity(map.len());
    for (asset, raw) in map {
        let parsed = match raw {
            serde_json::Value::String(s) => s.parse::<Decimal>().ok(),
            serde_json::Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
            _ => None,
        };
        match parsed {
            Some(price) => out.push((asset.clone(), price)),
            None => debug!("Unparsable price for '{}': {}", asset, raw),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_map_strings() {
        let prices =
            parse_price_map(r#"{"bitcoin":"50000.12","ethereum":"4012.5"}"#).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].0, "bitcoin");
        assert_eq!(prices[0].1, "50000.12".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_parse_price_map_tolerates_numbers() {
        let prices = parse_price_map(r#"{"solana":142.07}"#).unwrap();
        assert_eq!(prices[0].1, "142.07".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_parse_price_map_drops_bad_entries() {
        let prices = parse_price_map(r#"{"bitcoin":"oops","ethereum":"4012.5","x":null}"#).unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].0, "ethereum");
    }

    #[test]
    fn test_parse_price_map_rejects_non_objects() {
        assert!(parse_price_map("[1,2,3]").is_none());
        assert!(parse_price_map("not json").is_none());
        assert!(parse_price_map("\"ping\"").is_none());
    }

    #[tokio::test]
    async fn test_handle_frame_updates_only_subscribed_assets() {
        let cache = TickCache::new();
        let connector = FeedConnector::new(
            "wss://example.invalid/prices".to_string(),
            SymbolMap::builtin(),
            cache.clone(),
            Arc::new(ReconnectSignal::new()),
            Duration::from_secs(3),
        );

        connector
            .handle_frame(r#"{"bitcoin":"50000","dogecoin":"0.1"}"#)
            .await;

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        let btc = SymbolMap::builtin().feed_id("bitcoin").unwrap();
        assert_eq!(snapshot[&btc].price, Decimal::from(50000));
        assert_eq!(snapshot[&btc].size, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_handle_frame_ignores_garbage() {
        let cache = TickCache::new();
        let connector = FeedConnector::new(
            "wss://example.invalid/prices".to_string(),
            SymbolMap::builtin(),
            cache.clone(),
            Arc::new(ReconnectSignal::new()),
            Duration::from_secs(3),
        );

        connector.handle_frame("][ not json").await;
        connector.handle_frame(r#"{"type":"heartbeat"}"#).await;

        assert!(cache.snapshot().await.is_empty());
    }
}
