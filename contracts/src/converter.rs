//! # Currency Converter
//!
//! Values an amount of any supported asset in reference-currency units at
//! the current price. The arithmetic is
//! [`custodia_protocol::fixed::to_reference`]; this module only wires it to
//! the registry (for the asset's precision) and the oracle adapter (for a
//! validated price).

use custodia_protocol::fixed;
use custodia_protocol::{Amount, AssetId, Host};

use crate::error::VaultError;
use crate::oracle::OracleAdapter;
use crate::registry::AssetRegistry;

/// Converts native-unit amounts to reference units.
pub struct CurrencyConverter<'a> {
    registry: &'a AssetRegistry,
    oracle: OracleAdapter<'a>,
}

impl<'a> CurrencyConverter<'a> {
    /// Creates a converter over the given host and registry.
    pub fn new(host: &'a Host, registry: &'a AssetRegistry) -> Self {
        Self {
            registry,
            oracle: OracleAdapter::new(host, registry),
        }
    }

    /// Values `amount` of `asset` in reference units, truncating.
    ///
    /// # Errors
    ///
    /// - [`VaultError::UnsupportedAsset`] if the asset is unknown.
    /// - Any oracle error ([`VaultError::InvalidOrStalePrice`],
    ///   [`VaultError::FeedUnavailable`]).
    /// - [`VaultError::ArithmeticOverflow`] if the value does not fit.
    pub fn to_reference(&self, asset: &AssetId, amount: Amount) -> Result<u128, VaultError> {
        let decimals = self.registry.config(asset)?.decimals;
        let quote = self.oracle.current_price(asset)?;
        fixed::to_reference(amount, quote.price, decimals, quote.feed_decimals)
            .ok_or(VaultError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_feed::MockPriceFeed;
    use custodia_protocol::config::{NATIVE_UNIT, REFERENCE_UNIT};
    use custodia_protocol::{Address, SystemClock};
    use chrono::Utc;
    use std::sync::Arc;

    fn host_with_feeds() -> (Host, AssetRegistry, Address) {
        let host = Host::new(Arc::new(SystemClock));
        let eth_feed = Address::derive("feed:eth");
        let usdc_feed = Address::derive("feed:usdc");
        let usdc = Address::derive("token:usdc");
        host.deploy_feed(
            eth_feed,
            Arc::new(MockPriceFeed::new("ETH / USD", 8, 1_500_00000000, Utc::now())),
        );
        host.deploy_feed(
            usdc_feed,
            Arc::new(MockPriceFeed::new("USDC / USD", 8, 1_00000000, Utc::now())),
        );

        let mut registry = AssetRegistry::new(eth_feed).unwrap();
        registry.register(usdc, usdc_feed, |_| Ok(6)).unwrap();
        (host, registry, usdc)
    }

    #[test]
    fn native_conversion() {
        let (host, registry, _) = host_with_feeds();
        let converter = CurrencyConverter::new(&host, &registry);
        assert_eq!(
            converter.to_reference(&AssetId::Native, NATIVE_UNIT).unwrap(),
            1_500 * REFERENCE_UNIT
        );
        assert_eq!(
            converter
                .to_reference(&AssetId::Native, NATIVE_UNIT / 2)
                .unwrap(),
            750 * REFERENCE_UNIT
        );
    }

    #[test]
    fn token_conversion_uses_registered_decimals() {
        let (host, registry, usdc) = host_with_feeds();
        let converter = CurrencyConverter::new(&host, &registry);
        // 250 USDC (6 decimals) at 1.00.
        assert_eq!(
            converter
                .to_reference(&AssetId::Token(usdc), 250_000_000)
                .unwrap(),
            250 * REFERENCE_UNIT
        );
    }

    #[test]
    fn unknown_asset_rejected() {
        let (host, registry, _) = host_with_feeds();
        let converter = CurrencyConverter::new(&host, &registry);
        let unknown = AssetId::Token(Address::derive("token:nope"));
        assert_eq!(
            converter.to_reference(&unknown, 1).unwrap_err(),
            VaultError::UnsupportedAsset(unknown)
        );
    }

    #[test]
    fn overflow_reported() {
        let (host, registry, _) = host_with_feeds();
        let converter = CurrencyConverter::new(&host, &registry);
        assert_eq!(
            converter
                .to_reference(&AssetId::Native, u128::MAX)
                .unwrap_err(),
            VaultError::ArithmeticOverflow
        );
    }
}
