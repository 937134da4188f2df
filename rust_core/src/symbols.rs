//! Instrument identifier mapping.
//!
//! Static, injective table from feed asset name (the key used by the
//! streaming feed, e.g. "bitcoin") to the feed-local sentinel id of
//! `market.ticks_v1` and on to the canonical id of `market.symbols_v1`.
//! Validated once at load; changing the subscribed instrument set means
//! changing this table, which keeps the subscription list and the
//! translation step consistent by construction.

use crate::types::{CanonicalSymbolId, FeedSymbolId};
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// One subscribed instrument and its two identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instrument {
    /// Feed asset name, as it appears in the feed's payload keys.
    pub asset: String,
    pub feed_id: FeedSymbolId,
    pub canonical_id: CanonicalSymbolId,
}

#[derive(Debug, Error)]
pub enum SymbolMapError {
    #[error("instrument table is empty")]
    Empty,
    #[error("duplicate feed asset '{0}'")]
    DuplicateAsset(String),
    #[error("duplicate feed symbol id {0}")]
    DuplicateFeedId(FeedSymbolId),
    #[error("duplicate canonical symbol id {0}")]
    DuplicateCanonicalId(CanonicalSymbolId),
    #[error("invalid instrument spec '{0}' (expected asset=feed_uuid:canonical_uuid)")]
    InvalidSpec(String),
}

/// Validated feed-local -> canonical identifier mapping.
///
/// Declaration order is preserved: the subscription list sent to the feed
/// uses the same order the instruments were configured in.
#[derive(Clone, Debug)]
pub struct SymbolMap {
    instruments: Vec<Instrument>,
    by_asset: HashMap<String, usize>,
    by_feed_id: HashMap<FeedSymbolId, usize>,
}

impl SymbolMap {
    /// Build and validate a mapping. Duplicates on any of the three keys are
    /// a construction error: the mapping must stay injective end to end.
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, SymbolMapError> {
        if instruments.is_empty() {
            return Err(SymbolMapError::Empty);
        }

        let mut by_asset = HashMap::with_capacity(instruments.len());
        let mut by_feed_id = HashMap::with_capacity(instruments.len());
        let mut canonical_seen = HashMap::with_capacity(instruments.len());

        for (idx, inst) in instruments.iter().enumerate() {
            if by_asset.insert(inst.asset.clone(), idx).is_some() {
                return Err(SymbolMapError::DuplicateAsset(inst.asset.clone()));
            }
            if by_feed_id.insert(inst.feed_id, idx).is_some() {
                return Err(SymbolMapError::DuplicateFeedId(inst.feed_id));
            }
            if canonical_seen.insert(inst.canonical_id, idx).is_some() {
                return Err(SymbolMapError::DuplicateCanonicalId(inst.canonical_id));
            }
        }

        Ok(Self {
            instruments,
            by_asset,
            by_feed_id,
        })
    }

    /// The built-in production instrument set.
    ///
    /// Feed-local sentinel ids are the fixed `market.ticks_v1` keys; the
    /// canonical ids are the matching `market.symbols_v1` rows
    /// (BTC/USD, ETH/USD, SOL/USD).
    pub fn builtin() -> Self {
        let table = [
            (
                "bitcoin",
                "22222222-2222-2222-2222-222222222222",
                "d85b4396-20a5-4f47-91fa-d83b802734b5",
            ),
            (
                "ethereum",
                "33333333-3333-3333-3333-333333333333",
                "60f3954d-6fbf-427f-8670-e666c873b2e5",
            ),
            (
                "solana",
                "44444444-4444-4444-4444-444444444444",
                "37c9a4dc-438e-4366-8e73-35460f21bec8",
            ),
        ];

        let instruments = table
            .iter()
            .map(|(asset, feed, canonical)| Instrument {
                asset: asset.to_string(),
                feed_id: feed.parse().expect("builtin feed id"),
                canonical_id: canonical.parse().expect("builtin canonical id"),
            })
            .collect();

        Self::new(instruments).expect("builtin instrument table")
    }

    /// Load the mapping from the `INSTRUMENTS` environment variable, falling
    /// back to the built-in table when unset. Format: comma-separated
    /// `asset=feed_uuid:canonical_uuid` entries.
    pub fn from_env_or_builtin() -> Result<Self, SymbolMapError> {
        match env::var("INSTRUMENTS") {
            Ok(spec) if !spec.trim().is_empty() => Self::parse(&spec),
            _ => Ok(Self::builtin()),
        }
    }

    /// Parse a comma-separated list of `asset=feed_uuid:canonical_uuid`.
    pub fn parse(spec: &str) -> Result<Self, SymbolMapError> {
        let mut instruments = Vec::new();
        for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            instruments.push(Self::parse_entry(entry)?);
        }
        Self::new(instruments)
    }

    fn parse_entry(entry: &str) -> Result<Instrument, SymbolMapError> {
        let invalid = || SymbolMapError::InvalidSpec(entry.to_string());

        let (asset, ids) = entry.split_once('=').ok_or_else(invalid)?;
        let (feed, canonical) = ids.split_once(':').ok_or_else(invalid)?;

        let asset = asset.trim();
        if asset.is_empty() {
            return Err(invalid());
        }

        Ok(Instrument {
            asset: asset.to_string(),
            feed_id: feed.trim().parse().map_err(|_| invalid())?,
            canonical_id: canonical.trim().parse().map_err(|_| invalid())?,
        })
    }

    /// Feed sentinel id for a feed asset name, if subscribed.
    pub fn feed_id(&self, asset: &str) -> Option<FeedSymbolId> {
        self.by_asset
            .get(asset)
            .map(|&idx| self.instruments[idx].feed_id)
    }

    /// Canonical id for a feed sentinel id, if mapped.
    pub fn canonical_id(&self, feed_id: FeedSymbolId) -> Option<CanonicalSymbolId> {
        self.by_feed_id
            .get(&feed_id)
            .map(|&idx| self.instruments[idx].canonical_id)
    }

    /// Asset names in declaration order (the feed subscription list).
    pub fn assets(&self) -> Vec<&str> {
        self.instruments.iter().map(|i| i.asset.as_str()).collect()
    }

    /// Feed sentinel ids in declaration order (the watchdog's watch list).
    pub fn feed_ids(&self) -> Vec<FeedSymbolId> {
        self.instruments.iter().map(|i| i.feed_id).collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
