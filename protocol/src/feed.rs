//! # Price Feed Capability
//!
//! A price feed is an external contract that publishes the latest price of
//! one asset in reference-currency terms. The ledger only ever reads the
//! latest round; it never aggregates, smooths, or caches.
//!
//! The feed's state lives outside this system. The ledger holds a feed's
//! [`Address`](crate::types::Address) and resolves it through the
//! [`Host`](crate::host::Host) on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a feed can raise when read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The feed has never been updated.
    #[error("feed has no data")]
    NoData,

    /// The feed reverted for an implementation-specific reason.
    #[error("feed reverted: {0}")]
    Reverted(String),
}

/// The latest reading published by a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Monotonic round identifier.
    pub round_id: u64,
    /// The price, scaled by the feed's `decimals()`. Signed: a
    /// misbehaving feed can report zero or a negative value.
    pub answer: i128,
    /// When the round started.
    pub started_at: DateTime<Utc>,
    /// When the answer was last updated.
    pub updated_at: DateTime<Utc>,
    /// The round in which the answer was computed.
    pub answered_in_round: u64,
}

/// Read-only price feed interface (aggregator style).
pub trait PriceFeed: Send + Sync {
    /// Fractional digits of `answer`.
    fn decimals(&self) -> u8;

    /// Human-readable pair description, e.g. `"ETH / USD"`.
    fn description(&self) -> String;

    /// Returns the most recent round.
    fn latest_round_data(&self) -> Result<RoundData, FeedError>;
}
