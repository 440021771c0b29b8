//! # Mock Price Feed
//!
//! An aggregator-style feed whose answer is set by hand. Each update opens
//! a new round. Used by the test suite and by the devnet node.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use custodia_protocol::{FeedError, PriceFeed, RoundData};

/// A settable price feed.
#[derive(Debug)]
pub struct MockPriceFeed {
    decimals: u8,
    description: String,
    latest: RwLock<Option<RoundData>>,
}

impl MockPriceFeed {
    /// Creates a feed with an initial answer published at `at`.
    pub fn new(description: &str, decimals: u8, answer: i128, at: DateTime<Utc>) -> Self {
        let feed = Self::empty(description, decimals);
        feed.update_answer(answer, at);
        feed
    }

    /// Creates a feed that has never published.
    pub fn empty(description: &str, decimals: u8) -> Self {
        Self {
            decimals,
            description: description.to_string(),
            latest: RwLock::new(None),
        }
    }

    /// Publishes a new answer in a new round.
    pub fn update_answer(&self, answer: i128, at: DateTime<Utc>) {
        let mut latest = self.latest.write();
        let round_id = latest.map(|r| r.round_id + 1).unwrap_or(1);
        *latest = Some(RoundData {
            round_id,
            answer,
            started_at: at,
            updated_at: at,
            answered_in_round: round_id,
        });
    }

    /// Current round id, or 0 if nothing has been published.
    pub fn round_id(&self) -> u64 {
        self.latest.read().map(|r| r.round_id).unwrap_or(0)
    }
}

impl PriceFeed for MockPriceFeed {
    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn latest_round_data(&self) -> Result<RoundData, FeedError> {
        (*self.latest.read()).ok_or(FeedError::NoData)
    }
}
