//! # Devnet Environment
//!
//! The in-process host the node serves: one [`PricedVault`], the native
//! bank, and every mock token and price feed deployed through the API.
//!
//! Feeds and tokens are kept twice: as trait objects inside the [`Host`]
//! (which is all the vault ever sees) and as concrete mocks here, so the
//! devnet can mint, approve and move prices.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use custodia_contracts::{MockPriceFeed, MockToken, PricedVault, VaultConfig, VaultError};
use custodia_protocol::config::DEFAULT_FEED_DECIMALS;
use custodia_protocol::{
    Address, Amount, AssetId, Clock, Host, NativeError, PriceFeed, TokenError,
};

/// Failures of devnet-only operations.
#[derive(Debug, Error)]
pub enum DevnetError {
    #[error("no devnet feed at {0}")]
    UnknownFeed(Address),

    #[error("no devnet token at {0}")]
    UnknownToken(Address),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("native bank error: {0}")]
    Native(#[from] NativeError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Startup parameters.
#[derive(Debug, Clone, Copy)]
pub struct DevnetConfig {
    pub owner: Address,
    pub bank_cap: u128,
    /// Initial native price, scaled by [`DEFAULT_FEED_DECIMALS`].
    pub native_price: i128,
}

/// A deployed mock, as reported to API clients.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Deployment {
    pub address: Address,
    pub label: String,
}

pub struct Devnet {
    host: Arc<Host>,
    vault: Arc<PricedVault>,
    native_feed: Address,
    feeds: RwLock<HashMap<Address, Arc<MockPriceFeed>>>,
    tokens: RwLock<HashMap<Address, Arc<MockToken>>>,
}

impl Devnet {
    /// Boots a host with a native price feed and a vault on top of it.
    pub fn new(clock: Arc<dyn Clock>, config: DevnetConfig) -> Result<Self, DevnetError> {
        let host = Arc::new(Host::new(clock));
        let native_feed = Address::derive("custodia:feed:native");
        let feed = Arc::new(MockPriceFeed::new(
            "NATIVE / USD",
            DEFAULT_FEED_DECIMALS,
            config.native_price,
            host.clock().now(),
        ));
        host.deploy_feed(native_feed, feed.clone());

        let vault = PricedVault::new(
            host.clone(),
            VaultConfig {
                address: Address::derive("custodia:vault"),
                owner: config.owner,
                native_feed,
                bank_cap: config.bank_cap,
            },
        )?;

        let mut feeds = HashMap::new();
        feeds.insert(native_feed, feed);

        Ok(Self {
            host,
            vault: Arc::new(vault),
            native_feed,
            feeds: RwLock::new(feeds),
            tokens: RwLock::new(HashMap::new()),
        })
    }

    pub fn vault(&self) -> &Arc<PricedVault> {
        &self.vault
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn native_feed(&self) -> Address {
        self.native_feed
    }

    /// Deploys a new mock token. The address is derived from the symbol, so
    /// deploying the same symbol twice replaces the first deployment.
    pub fn deploy_token(&self, symbol: &str, decimals: u8) -> Deployment {
        let address = Address::derive(&format!("custodia:token:{symbol}"));
        let token = Arc::new(MockToken::new(symbol, decimals));
        self.host.deploy_token(address, token.clone());
        self.tokens.write().insert(address, token);
        tracing::info!(%address, symbol, decimals, "devnet token deployed");
        Deployment {
            address,
            label: symbol.to_string(),
        }
    }

    /// Deploys a new mock feed publishing `answer` now.
    pub fn deploy_feed(&self, description: &str, decimals: u8, answer: i128) -> Deployment {
        let address = Address::derive(&format!("custodia:feed:{description}"));
        let feed = Arc::new(MockPriceFeed::new(
            description,
            decimals,
            answer,
            self.host.clock().now(),
        ));
        self.host.deploy_feed(address, feed.clone());
        self.feeds.write().insert(address, feed);
        tracing::info!(%address, description, decimals, answer, "devnet feed deployed");
        Deployment {
            address,
            label: description.to_string(),
        }
    }

    /// Publishes a new answer on a devnet feed.
    pub fn update_price(&self, feed: &Address, answer: i128) -> Result<u64, DevnetError> {
        let mock = self
            .feeds
            .read()
            .get(feed)
            .cloned()
            .ok_or(DevnetError::UnknownFeed(*feed))?;
        mock.update_answer(answer, self.host.clock().now());
        tracing::info!(%feed, answer, round = mock.round_id(), "price updated");
        Ok(mock.round_id())
    }

    /// Re-publishes every feed's current answer at `now`, keeping devnet
    /// prices inside the staleness window. Returns how many were refreshed.
    pub fn refresh_feeds(&self, now: DateTime<Utc>) -> usize {
        let feeds: Vec<Arc<MockPriceFeed>> = self.feeds.read().values().cloned().collect();
        let mut refreshed = 0;
        for feed in feeds {
            if let Ok(round) = feed.latest_round_data() {
                feed.update_answer(round.answer, now);
                refreshed += 1;
            }
        }
        refreshed
    }

    /// Credits free funds to `account`: native currency straight into the
    /// bank, tokens by minting.
    pub fn faucet(
        &self,
        account: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Amount, DevnetError> {
        match asset {
            AssetId::Native => Ok(self.host.native().credit(account, amount)?),
            AssetId::Token(address) => {
                let token = self.token(address)?;
                token.mint(account, amount)?;
                Ok(custodia_protocol::Token::balance_of(token.as_ref(), account))
            }
        }
    }

    /// Lets the vault pull up to `amount` of `token` from `owner`.
    pub fn approve(&self, owner: &Address, token: &Address, amount: Amount) -> Result<(), DevnetError> {
        self.token(token)?.approve(owner, &self.vault.address(), amount);
        Ok(())
    }

    /// Wallet balance outside the vault.
    pub fn wallet_balance(&self, account: &Address, asset: &AssetId) -> Result<Amount, DevnetError> {
        match asset {
            AssetId::Native => Ok(self.host.native().balance_of(account)),
            AssetId::Token(address) => {
                let token = self.token(address)?;
                Ok(custodia_protocol::Token::balance_of(token.as_ref(), account))
            }
        }
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.read().len()
    }

    fn token(&self, address: &Address) -> Result<Arc<MockToken>, DevnetError> {
        self.tokens
            .read()
            .get(address)
            .cloned()
            .ok_or(DevnetError::UnknownToken(*address))
    }
}
