//! # Asset Registry
//!
//! Which assets the vault accepts, their decimal precision, and the feed
//! that prices them. The native asset is supported from construction;
//! tokens are added by the owner and never removed.
//!
//! Registered tokens are kept in an append-only list alongside the lookup
//! map. Valuation scans walk the list, so traversal order is insertion order
//! and therefore deterministic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use custodia_protocol::config::NATIVE_DECIMALS;
use custodia_protocol::{Address, AssetId};

use crate::error::VaultError;

/// Per-asset configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Fractional digits of the asset's base unit.
    pub decimals: u8,
    /// Address of the feed pricing this asset.
    pub feed: Address,
    /// Whether deposits and withdrawals are accepted.
    pub supported: bool,
}

/// Mapping from asset to configuration, with insertion-ordered iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRegistry {
    configs: HashMap<AssetId, AssetConfig>,
    tokens: Vec<Address>,
}

impl AssetRegistry {
    /// Creates a registry containing only the native asset.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidFeed`] if `native_feed` is the null address.
    pub fn new(native_feed: Address) -> Result<Self, VaultError> {
        if native_feed.is_zero() {
            return Err(VaultError::InvalidFeed(native_feed));
        }

        let mut configs = HashMap::new();
        configs.insert(
            AssetId::Native,
            AssetConfig {
                decimals: NATIVE_DECIMALS,
                feed: native_feed,
                supported: true,
            },
        );

        Ok(Self {
            configs,
            tokens: Vec::new(),
        })
    }

    /// Adds `token`, priced by `feed`.
    ///
    /// Validation runs before `decimals_of` is consulted, so a rejected
    /// registration never touches the token contract.
    ///
    /// # Errors
    ///
    /// - [`VaultError::AlreadySupported`] if the token is already registered.
    /// - [`VaultError::InvalidFeed`] if `feed` is the null address.
    /// - Whatever `decimals_of` returns.
    pub fn register<F>(
        &mut self,
        token: Address,
        feed: Address,
        decimals_of: F,
    ) -> Result<AssetConfig, VaultError>
    where
        F: FnOnce(&Address) -> Result<u8, VaultError>,
    {
        let asset = AssetId::Token(token);
        if self.is_supported(&asset) {
            return Err(VaultError::AlreadySupported(asset));
        }
        if feed.is_zero() {
            return Err(VaultError::InvalidFeed(feed));
        }

        let decimals = decimals_of(&token)?;
        let config = AssetConfig {
            decimals,
            feed,
            supported: true,
        };

        self.configs.insert(asset, config);
        self.tokens.push(token);
        Ok(config)
    }

    /// Points `asset` at a new feed. Returns the previous feed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidFeed`] if `feed` is the null address.
    /// - [`VaultError::UnsupportedAsset`] if `asset` is unknown.
    pub fn set_feed(&mut self, asset: AssetId, feed: Address) -> Result<Address, VaultError> {
        if feed.is_zero() {
            return Err(VaultError::InvalidFeed(feed));
        }
        let config = self
            .configs
            .get_mut(&asset)
            .ok_or(VaultError::UnsupportedAsset(asset))?;
        Ok(std::mem::replace(&mut config.feed, feed))
    }

    /// `true` for the native asset and every registered token.
    pub fn is_supported(&self, asset: &AssetId) -> bool {
        self.configs.get(asset).map(|c| c.supported).unwrap_or(false)
    }

    /// Configuration of a supported asset.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedAsset`] for unknown assets.
    pub fn config(&self, asset: &AssetId) -> Result<&AssetConfig, VaultError> {
        self.configs
            .get(asset)
            .filter(|c| c.supported)
            .ok_or(VaultError::UnsupportedAsset(*asset))
    }

    /// Registered tokens, in registration order. Excludes the native asset.
    pub fn list_supported(&self) -> Vec<AssetId> {
        self.tokens.iter().copied().map(AssetId::Token).collect()
    }

    /// The native asset followed by every registered token.
    pub fn valuation_order(&self) -> impl Iterator<Item = AssetId> + '_ {
        std::iter::once(AssetId::Native).chain(self.tokens.iter().copied().map(AssetId::Token))
    }

    /// Number of registered tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> Address {
        Address::derive("feed")
    }

    #[test]
    fn native_is_supported_from_construction() {
        let reg = AssetRegistry::new(feed()).unwrap();
        assert!(reg.is_supported(&AssetId::Native));
        assert_eq!(reg.config(&AssetId::Native).unwrap().decimals, 18);
        assert!(reg.list_supported().is_empty());
    }

    #[test]
    fn null_native_feed_rejected() {
        let err = AssetRegistry::new(Address::ZERO).unwrap_err();
        assert_eq!(err, VaultError::InvalidFeed(Address::ZERO));
    }

    #[test]
    fn registration_preserves_order() {
        let mut reg = AssetRegistry::new(feed()).unwrap();
        let a = Address::derive("a");
        let b = Address::derive("b");
        let c = Address::derive("c");
        for t in [b, a, c] {
            reg.register(t, feed(), |_| Ok(6)).unwrap();
        }

        assert_eq!(
            reg.list_supported(),
            vec![AssetId::Token(b), AssetId::Token(a), AssetId::Token(c)]
        );
        let order: Vec<_> = reg.valuation_order().collect();
        assert_eq!(order[0], AssetId::Native);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn duplicate_registration_rejected_before_metadata_query() {
        let mut reg = AssetRegistry::new(feed()).unwrap();
        let t = Address::derive("t");
        reg.register(t, feed(), |_| Ok(6)).unwrap();

        let err = reg
            .register(t, feed(), |_| panic!("metadata must not be queried"))
            .unwrap_err();
        assert_eq!(err, VaultError::AlreadySupported(AssetId::Token(t)));
        assert_eq!(reg.token_count(), 1);
    }

    #[test]
    fn null_feed_rejected() {
        let mut reg = AssetRegistry::new(feed()).unwrap();
        let err = reg
            .register(Address::derive("t"), Address::ZERO, |_| Ok(6))
            .unwrap_err();
        assert_eq!(err, VaultError::InvalidFeed(Address::ZERO));
    }

    #[test]
    fn failed_metadata_query_leaves_registry_unchanged() {
        let mut reg = AssetRegistry::new(feed()).unwrap();
        let t = Address::derive("t");
        let err = reg
            .register(t, feed(), |addr| Err(VaultError::AssetUnavailable(*addr)))
            .unwrap_err();
        assert_eq!(err, VaultError::AssetUnavailable(t));
        assert!(!reg.is_supported(&AssetId::Token(t)));
    }

    #[test]
    fn set_feed_replaces_reference() {
        let mut reg = AssetRegistry::new(feed()).unwrap();
        let new_feed = Address::derive("feed2");
        let previous = reg.set_feed(AssetId::Native, new_feed).unwrap();
        assert_eq!(previous, feed());
        assert_eq!(reg.config(&AssetId::Native).unwrap().feed, new_feed);

        let unknown = AssetId::Token(Address::derive("nope"));
        assert_eq!(
            reg.set_feed(unknown, new_feed).unwrap_err(),
            VaultError::UnsupportedAsset(unknown)
        );
        assert_eq!(
            reg.set_feed(AssetId::Native, Address::ZERO).unwrap_err(),
            VaultError::InvalidFeed(Address::ZERO)
        );
    }
}
