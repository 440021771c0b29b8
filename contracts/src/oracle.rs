//! # Price Oracle Adapter
//!
//! Reads the current price of an asset from its feed and refuses readings
//! that cannot be trusted. A reading is rejected when:
//!
//! - the answer is zero or negative, or
//! - the last update is more than [`MAX_FEED_AGE`] before the host clock.
//!
//! There is no cache. Every call resolves the feed address through the host
//! and reads the latest round again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use custodia_protocol::config::MAX_FEED_AGE;
use custodia_protocol::{AssetId, Host};

use crate::error::VaultError;
use crate::registry::AssetRegistry;

/// A validated price reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Strictly positive price, scaled by `feed_decimals`.
    pub price: u128,
    /// Fractional digits of `price`.
    pub feed_decimals: u8,
    /// When the feed last updated.
    pub updated_at: DateTime<Utc>,
}

/// Validating view over the host's feeds.
pub struct OracleAdapter<'a> {
    host: &'a Host,
    registry: &'a AssetRegistry,
    max_age: Duration,
}

impl<'a> OracleAdapter<'a> {
    /// Creates an adapter using the standard staleness threshold.
    pub fn new(host: &'a Host, registry: &'a AssetRegistry) -> Self {
        let max_age = Duration::from_std(MAX_FEED_AGE).unwrap_or_else(|_| Duration::minutes(30));
        Self {
            host,
            registry,
            max_age,
        }
    }

    /// Returns the current validated price of `asset`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::UnsupportedAsset`] if the asset has no configuration.
    /// - [`VaultError::FeedUnavailable`] if nothing is deployed at the feed address.
    /// - [`VaultError::InvalidOrStalePrice`] if the feed reverts, reports a
    ///   non-positive answer, or is older than the threshold.
    pub fn current_price(&self, asset: &AssetId) -> Result<PriceQuote, VaultError> {
        let config = self.registry.config(asset)?;
        let feed = self
            .host
            .feed(&config.feed)
            .ok_or(VaultError::FeedUnavailable(config.feed))?;

        let round = feed.latest_round_data().map_err(|e| {
            tracing::warn!(%asset, feed = %config.feed, error = %e, "feed read failed");
            VaultError::InvalidOrStalePrice { asset: *asset }
        })?;

        if round.answer <= 0 {
            tracing::warn!(%asset, answer = round.answer, "non-positive price rejected");
            return Err(VaultError::InvalidOrStalePrice { asset: *asset });
        }

        let age = self.host.clock().now() - round.updated_at;
        if age > self.max_age {
            tracing::warn!(
                %asset,
                age_secs = age.num_seconds(),
                max_secs = self.max_age.num_seconds(),
                "stale price rejected"
            );
            return Err(VaultError::InvalidOrStalePrice { asset: *asset });
        }

        Ok(PriceQuote {
            price: round.answer as u128,
            feed_decimals: feed.decimals(),
            updated_at: round.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_feed::MockPriceFeed;
    use chrono::TimeZone;
    use custodia_protocol::{Address, Clock, ManualClock};
    use std::sync::Arc;

    fn setup() -> (Host, Arc<ManualClock>, Arc<MockPriceFeed>, AssetRegistry) {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let host = Host::new(clock.clone());
        let feed_addr = Address::derive("feed:native");
        let feed = Arc::new(MockPriceFeed::new("ETH / USD", 8, 2_000_00000000, start));
        host.deploy_feed(feed_addr, feed.clone());
        let registry = AssetRegistry::new(feed_addr).unwrap();
        (host, clock, feed, registry)
    }

    #[test]
    fn fresh_positive_price_accepted() {
        let (host, _clock, _feed, registry) = setup();
        let quote = OracleAdapter::new(&host, &registry)
            .current_price(&AssetId::Native)
            .unwrap();
        assert_eq!(quote.price, 2_000_00000000);
        assert_eq!(quote.feed_decimals, 8);
    }

    #[test]
    fn exactly_thirty_minutes_old_is_still_fresh() {
        let (host, clock, _feed, registry) = setup();
        clock.advance(Duration::minutes(30));
        assert!(OracleAdapter::new(&host, &registry)
            .current_price(&AssetId::Native)
            .is_ok());
    }

    #[test]
    fn stale_price_rejected() {
        let (host, clock, _feed, registry) = setup();
        clock.advance(Duration::minutes(30) + Duration::seconds(1));
        let err = OracleAdapter::new(&host, &registry)
            .current_price(&AssetId::Native)
            .unwrap_err();
        assert_eq!(
            err,
            VaultError::InvalidOrStalePrice {
                asset: AssetId::Native
            }
        );
    }

    #[test]
    fn non_positive_price_rejected() {
        let (host, clock, feed, registry) = setup();
        let adapter = OracleAdapter::new(&host, &registry);

        feed.update_answer(0, clock.now());
        assert!(adapter.current_price(&AssetId::Native).is_err());

        feed.update_answer(-5, clock.now());
        assert!(adapter.current_price(&AssetId::Native).is_err());
    }

    #[test]
    fn every_call_rereads_the_feed() {
        let (host, clock, feed, registry) = setup();
        let adapter = OracleAdapter::new(&host, &registry);
        assert_eq!(
            adapter.current_price(&AssetId::Native).unwrap().price,
            2_000_00000000
        );

        feed.update_answer(1_500_00000000, clock.now());
        assert_eq!(
            adapter.current_price(&AssetId::Native).unwrap().price,
            1_500_00000000
        );
    }

    #[test]
    fn missing_feed_contract_reported() {
        let (host, _clock, _feed, mut registry) = setup();
        let nowhere = Address::derive("feed:nowhere");
        registry.set_feed(AssetId::Native, nowhere).unwrap();
        let err = OracleAdapter::new(&host, &registry)
            .current_price(&AssetId::Native)
            .unwrap_err();
        assert_eq!(err, VaultError::FeedUnavailable(nowhere));
    }
}
