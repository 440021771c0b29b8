//! # Host Environment
//!
//! The [`Host`] is everything outside the ledger that the ledger can see:
//! the clock, the native bank, and a directory of deployed token and feed
//! contracts keyed by address.
//!
//! The ledger stores only addresses. Every feed read and token call goes
//! through [`Host::feed`] / [`Host::token`], so replacing a contract at an
//! address is immediately visible and a missing contract is a lookup miss,
//! never a dangling pointer.

use dashmap::DashMap;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::feed::PriceFeed;
use crate::native::NativeBank;
use crate::token::Token;
use crate::types::Address;

/// Shared host environment.
pub struct Host {
    clock: Arc<dyn Clock>,
    native: Arc<NativeBank>,
    feeds: DashMap<Address, Arc<dyn PriceFeed>>,
    tokens: DashMap<Address, Arc<dyn Token>>,
}

impl Host {
    /// Creates an empty host driven by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            native: Arc::new(NativeBank::new()),
            feeds: DashMap::new(),
            tokens: DashMap::new(),
        }
    }

    /// Creates an empty host on wall-clock time.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// The host clock.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The native-currency bank.
    pub fn native(&self) -> &NativeBank {
        &self.native
    }

    /// Places a feed at `address`, replacing whatever was there.
    pub fn deploy_feed(&self, address: Address, feed: Arc<dyn PriceFeed>) {
        tracing::debug!(%address, description = %feed.description(), "feed deployed");
        self.feeds.insert(address, feed);
    }

    /// Places a token at `address`, replacing whatever was there.
    pub fn deploy_token(&self, address: Address, token: Arc<dyn Token>) {
        tracing::debug!(%address, symbol = %token.symbol(), "token deployed");
        self.tokens.insert(address, token);
    }

    /// Resolves a feed reference.
    pub fn feed(&self, address: &Address) -> Option<Arc<dyn PriceFeed>> {
        self.feeds.get(address).map(|entry| Arc::clone(entry.value()))
    }

    /// Resolves a token reference.
    pub fn token(&self, address: &Address) -> Option<Arc<dyn Token>> {
        self.tokens.get(address).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of deployed feeds.
    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Number of deployed tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("feeds", &self.feeds.len())
            .field("tokens", &self.tokens.len())
            .field("native", &self.native)
            .finish()
    }
}
