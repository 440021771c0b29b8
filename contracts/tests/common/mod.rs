//! Shared fixture for the vault integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use custodia_contracts::{MockPriceFeed, MockToken, PricedVault, VaultConfig};
use custodia_protocol::config::NATIVE_UNIT;
use custodia_protocol::{Address, AssetId, Host, ManualClock};

pub const USD: i128 = 100_000_000;

pub fn owner() -> Address {
    Address::derive("owner")
}

pub fn alice() -> Address {
    Address::derive("alice")
}

pub fn bob() -> Address {
    Address::derive("bob")
}

pub fn vault_address() -> Address {
    Address::derive("vault")
}

pub struct World {
    pub clock: Arc<ManualClock>,
    pub host: Arc<Host>,
    pub vault: Arc<PricedVault>,
    pub native_feed: Arc<MockPriceFeed>,
}

impl World {
    /// A vault with the native asset priced at `native_price` whole USD and
    /// 100 native units credited to alice and bob.
    pub fn new(native_price: i128, bank_cap: u128) -> Self {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let host = Arc::new(Host::new(clock.clone()));

        let native_feed = Arc::new(MockPriceFeed::new("ETH / USD", 8, native_price * USD, start));
        host.deploy_feed(Address::derive("feed:native"), native_feed.clone());

        host.native().credit(&alice(), 100 * NATIVE_UNIT).unwrap();
        host.native().credit(&bob(), 100 * NATIVE_UNIT).unwrap();

        let vault = PricedVault::new(
            host.clone(),
            VaultConfig {
                address: vault_address(),
                owner: owner(),
                native_feed: Address::derive("feed:native"),
                bank_cap,
            },
        )
        .unwrap();

        Self {
            clock,
            host,
            vault: Arc::new(vault),
            native_feed,
        }
    }

    /// Deploys and registers a token with its own feed. Mints `supply` to
    /// alice and approves the vault for all of it.
    pub fn add_token(
        &self,
        symbol: &str,
        decimals: u8,
        price: i128,
        supply: u128,
    ) -> (Address, Arc<MockToken>, Arc<MockPriceFeed>) {
        let token_addr = Address::derive(&format!("token:{symbol}"));
        let feed_addr = Address::derive(&format!("feed:{symbol}"));

        let token = Arc::new(MockToken::new(symbol, decimals));
        let feed = Arc::new(MockPriceFeed::new(symbol, 8, price, self.clock_now()));
        self.host.deploy_token(token_addr, token.clone());
        self.host.deploy_feed(feed_addr, feed.clone());

        token.mint(&alice(), supply).unwrap();
        token.approve(&alice(), &vault_address(), supply);

        self.vault
            .register_asset(&owner(), token_addr, feed_addr)
            .unwrap();
        (token_addr, token, feed)
    }

    pub fn clock_now(&self) -> chrono::DateTime<Utc> {
        use custodia_protocol::Clock;
        self.clock.now()
    }

    /// Asserts the reserve invariants for every supported asset.
    pub fn assert_consistent(&self, accounts: &[Address]) {
        assert!(self.vault.audit().is_empty(), "audit: {:?}", self.vault.audit());
        for asset in self.vault.supported_assets() {
            let reserve = self.vault.reserve(&asset).unwrap();
            let mut sum = 0u128;
            for account in accounts {
                let balance = self.vault.balance_of(account, &asset).unwrap();
                assert!(balance <= reserve);
                sum += balance;
            }
            assert_eq!(sum, reserve, "reserve mismatch for {asset}");
        }
    }

    pub fn native_reserve(&self) -> u128 {
        self.vault.reserve(&AssetId::Native).unwrap()
    }
}
