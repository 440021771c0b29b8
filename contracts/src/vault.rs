//! # Priced Vault
//!
//! A custodial ledger holding the native currency and registered tokens on
//! behalf of many accounts. Every deposit is valued in the reference
//! currency and refused if the vault's total exposure at current prices
//! would pass the bank cap. Every withdrawal is valued the same way and
//! refused above a fixed per-transaction limit.
//!
//! ## Request lifecycle
//!
//! Each mutating entry point:
//!
//! 1. Takes the reentrancy guard. A nested call, from a token or a receive
//!    hook the vault is currently paying, fails with
//!    [`VaultError::ReentrantCall`].
//! 2. Rejects a zero amount before touching state or feeds.
//! 3. Validates under a shared lock: supported asset, fresh price, cap or
//!    limit, balance.
//! 4. Moves value. Deposits pull first and credit after. Withdrawals debit
//!    first, release every lock, then pay out, so untrusted code running
//!    during the payout sees the debit.
//! 5. On a failed payout, replays the undo journal so state is exactly what
//!    it was before the request.
//!
//! No lock is held while a token or receive hook runs. Feeds are read under
//! the shared lock only, and every query takes it recursively, so a feed that
//! calls back into a query cannot deadlock.
//!
//! ## Concurrency
//!
//! The vault expects its host to run one top-level request at a time. The
//! guard is per vault, not per thread: a second request that overlaps the
//! first from another thread is refused with [`VaultError::ReentrantCall`]
//! rather than queued.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use custodia_protocol::fixed::format_reference;
use custodia_protocol::{Address, Amount, AssetId, Host};

use crate::capacity::{CapacityEnforcer, WithdrawalLimiter};
use crate::converter::CurrencyConverter;
use crate::error::VaultError;
use crate::events::{EventRecord, VaultEvent};
use crate::guard::ReentrancyGuard;
use crate::registry::{AssetConfig, AssetRegistry};
use crate::state::{AuditMismatch, Journal, LedgerSnapshot, LedgerState, ReserveCounters};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Address the vault holds custody under.
    pub address: Address,
    /// The privileged caller.
    pub owner: Address,
    /// Feed pricing the native asset.
    pub native_feed: Address,
    /// Maximum total valuation, in reference units.
    pub bank_cap: u128,
}

#[derive(Debug)]
struct VaultState {
    registry: AssetRegistry,
    ledger: LedgerState,
}

/// Outcome of a successful deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Amount moved, in the asset's base unit.
    pub amount: Amount,
    /// Value of the amount at the price used, in reference units.
    pub reference_value: u128,
    /// Account balance after the operation.
    pub balance: Amount,
    /// Sequence number of the emitted event.
    pub event_seq: u64,
}

// ---------------------------------------------------------------------------
// PricedVault
// ---------------------------------------------------------------------------

/// The custodial ledger.
pub struct PricedVault {
    address: Address,
    owner: Address,
    bank_cap: u128,
    host: Arc<Host>,
    state: RwLock<VaultState>,
    guard: ReentrancyGuard,
    limiter: WithdrawalLimiter,
}

impl PricedVault {
    /// Creates a vault that supports only the native asset.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidCapValue`] if `bank_cap` is zero.
    /// - [`VaultError::InvalidFeed`] if `native_feed` is the null address.
    pub fn new(host: Arc<Host>, config: VaultConfig) -> Result<Self, VaultError> {
        if config.bank_cap == 0 {
            return Err(VaultError::InvalidCapValue);
        }
        let registry = AssetRegistry::new(config.native_feed)?;

        tracing::info!(
            vault = %config.address,
            owner = %config.owner,
            bank_cap = %format_reference(config.bank_cap),
            native_feed = %config.native_feed,
            "vault created"
        );

        Ok(Self {
            address: config.address,
            owner: config.owner,
            bank_cap: config.bank_cap,
            host,
            state: RwLock::new(VaultState {
                registry,
                ledger: LedgerState::new(),
            }),
            guard: ReentrancyGuard::new(),
            limiter: WithdrawalLimiter::standard(),
        })
    }

    // -- Deposits -----------------------------------------------------------

    /// Deposits native currency. `amount` is the value attached to the call
    /// and is taken from the caller's native balance once every check passes.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::InvalidOrStalePrice`],
    /// [`VaultError::BankCapExceeded`], [`VaultError::TransferFailed`] if the
    /// caller cannot cover the attached value, [`VaultError::ReentrantCall`].
    pub fn deposit_native(&self, caller: &Address, amount: Amount) -> Result<Receipt, VaultError> {
        self.deposit(caller, AssetId::Native, amount)
    }

    /// Deposits `amount` of a registered token, pulled from the caller with
    /// `transfer_from`. The caller must have approved the vault beforehand.
    ///
    /// # Errors
    ///
    /// As [`deposit_native`](Self::deposit_native), plus
    /// [`VaultError::UnsupportedAsset`] for unregistered tokens and
    /// [`VaultError::TransferFailed`] if the token refuses the pull.
    pub fn deposit_asset(
        &self,
        caller: &Address,
        token: Address,
        amount: Amount,
    ) -> Result<Receipt, VaultError> {
        self.deposit(caller, AssetId::Token(token), amount)
    }

    /// Deposits `amount` of any supported asset.
    pub fn deposit(
        &self,
        caller: &Address,
        asset: AssetId,
        amount: Amount,
    ) -> Result<Receipt, VaultError> {
        let _entered = self.guard.enter()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let reference_value = {
            let state = self.state.read();
            if !state.registry.is_supported(&asset) {
                return Err(VaultError::UnsupportedAsset(asset));
            }
            let converter = CurrencyConverter::new(&self.host, &state.registry);
            // A value too large for u128 is over any cap.
            let reference_value = converter.to_reference(&asset, amount).map_err(|e| match e {
                VaultError::ArithmeticOverflow => VaultError::BankCapExceeded {
                    cap: self.bank_cap,
                    projected: u128::MAX,
                },
                other => other,
            })?;

            let enforcer = CapacityEnforcer::new(&state.registry, &converter, self.bank_cap);
            let projected =
                enforcer.check_capacity(reference_value, |a| state.ledger.reserve(a))?;
            state.ledger.can_credit(caller, &asset, amount)?;

            tracing::debug!(%asset, reference_value, projected, cap = self.bank_cap, "deposit within cap");
            reference_value
        };

        self.pull(caller, &asset, amount)?;

        let mut state = self.state.write();
        let mut journal = Journal::new();
        if let Err(err) = state.ledger.credit(&mut journal, caller, &asset, amount) {
            state.ledger.rollback(journal);
            drop(state);
            tracing::error!(account = %caller, %asset, amount, error = %err, "credit failed after pull, refunding");
            self.refund(caller, &asset, amount);
            return Err(err);
        }
        let event_seq = state.ledger.record_event(
            &mut journal,
            self.host.clock().now(),
            VaultEvent::Deposited {
                account: *caller,
                asset,
                amount,
                reference_value,
            },
        );
        let balance = state.ledger.balance_of(caller, &asset);

        tracing::info!(
            account = %caller,
            %asset,
            amount,
            reference_value = %format_reference(reference_value),
            balance,
            "deposit credited"
        );

        Ok(Receipt {
            amount,
            reference_value,
            balance,
            event_seq,
        })
    }

    // -- Withdrawals --------------------------------------------------------

    /// Withdraws native currency to the caller.
    ///
    /// The payout runs the caller's receive hook, if any, after the balance
    /// has already been debited.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::InvalidOrStalePrice`],
    /// [`VaultError::WithdrawalLimitExceeded`],
    /// [`VaultError::InsufficientFunds`], [`VaultError::TransferFailed`],
    /// [`VaultError::ReentrantCall`].
    pub fn withdraw_native(&self, caller: &Address, amount: Amount) -> Result<Receipt, VaultError> {
        self.withdraw(caller, AssetId::Native, amount)
    }

    /// Withdraws `amount` of a registered token to the caller.
    ///
    /// # Errors
    ///
    /// As [`withdraw_native`](Self::withdraw_native), plus
    /// [`VaultError::UnsupportedAsset`].
    pub fn withdraw_asset(
        &self,
        caller: &Address,
        token: Address,
        amount: Amount,
    ) -> Result<Receipt, VaultError> {
        self.withdraw(caller, AssetId::Token(token), amount)
    }

    /// Withdraws `amount` of any supported asset.
    pub fn withdraw(
        &self,
        caller: &Address,
        asset: AssetId,
        amount: Amount,
    ) -> Result<Receipt, VaultError> {
        let _entered = self.guard.enter()?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let reference_value = {
            let state = self.state.read();
            if !state.registry.is_supported(&asset) {
                return Err(VaultError::UnsupportedAsset(asset));
            }
            let converter = CurrencyConverter::new(&self.host, &state.registry);
            let reference_value = converter.to_reference(&asset, amount).map_err(|e| match e {
                VaultError::ArithmeticOverflow => VaultError::WithdrawalLimitExceeded {
                    limit: self.limiter.limit(),
                    requested: u128::MAX,
                },
                other => other,
            })?;
            self.limiter.check(reference_value)?;

            let available = state.ledger.balance_of(caller, &asset);
            if amount > available {
                return Err(VaultError::InsufficientFunds {
                    available,
                    requested: amount,
                });
            }
            reference_value
        };

        // Effects.
        let (journal, balance) = {
            let mut state = self.state.write();
            let mut journal = Journal::new();
            state.ledger.debit(&mut journal, caller, &asset, amount)?;
            (journal, state.ledger.balance_of(caller, &asset))
        };

        // Interactions. No lock is held here.
        if let Err(err) = self.push(caller, &asset, amount) {
            self.state.write().ledger.rollback(journal);
            tracing::warn!(account = %caller, %asset, amount, "payout failed, debit rolled back");
            return Err(err);
        }

        let event_seq = self.state.write().ledger.record_event(
            &mut Journal::new(),
            self.host.clock().now(),
            VaultEvent::Withdrawn {
                account: *caller,
                asset,
                amount,
                reference_value,
            },
        );

        tracing::info!(
            account = %caller,
            %asset,
            amount,
            reference_value = %format_reference(reference_value),
            balance,
            "withdrawal paid"
        );

        Ok(Receipt {
            amount,
            reference_value,
            balance,
            event_seq,
        })
    }

    // -- Administration -----------------------------------------------------

    /// Adds a token to the supported set, priced by `feed`. Owner only.
    ///
    /// The token's decimal precision is read from the token itself.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not the owner.
    /// - [`VaultError::AlreadySupported`] for the native sentinel or a
    ///   token already registered.
    /// - [`VaultError::InvalidFeed`] if `feed` is the null address.
    /// - [`VaultError::AssetUnavailable`] if no token is deployed at the
    ///   asset's address.
    pub fn register_asset(
        &self,
        caller: &Address,
        asset: impl Into<AssetId>,
        feed: Address,
    ) -> Result<AssetConfig, VaultError> {
        let _entered = self.guard.enter()?;
        self.require_owner(caller)?;

        let asset = asset.into();
        let token = match asset {
            AssetId::Native => return Err(VaultError::AlreadySupported(asset)),
            AssetId::Token(token) => token,
        };
        if self.state.read().registry.is_supported(&asset) {
            return Err(VaultError::AlreadySupported(asset));
        }
        if feed.is_zero() {
            return Err(VaultError::InvalidFeed(feed));
        }

        let contract = self
            .host
            .token(&token)
            .ok_or(VaultError::AssetUnavailable(token))?;
        let decimals = contract.decimals();
        let symbol = contract.symbol();

        let mut state = self.state.write();
        let config = state.registry.register(token, feed, |_| Ok(decimals))?;
        state.ledger.record_event(
            &mut Journal::new(),
            self.host.clock().now(),
            VaultEvent::AssetRegistered {
                asset,
                feed,
                decimals,
            },
        );

        tracing::info!(%token, %feed, decimals, %symbol, "asset registered");
        Ok(config)
    }

    /// Points `asset` at a new price feed. Owner only.
    ///
    /// Returns the previous feed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not the owner.
    /// - [`VaultError::InvalidFeed`] if `feed` is the null address.
    /// - [`VaultError::UnsupportedAsset`] if `asset` is unknown.
    pub fn set_feed(
        &self,
        caller: &Address,
        asset: AssetId,
        feed: Address,
    ) -> Result<Address, VaultError> {
        let _entered = self.guard.enter()?;
        self.require_owner(caller)?;

        let mut state = self.state.write();
        let previous = state.registry.set_feed(asset, feed)?;
        state.ledger.record_event(
            &mut Journal::new(),
            self.host.clock().now(),
            VaultEvent::FeedUpdated {
                asset,
                previous,
                feed,
            },
        );

        tracing::info!(%asset, %previous, %feed, "price feed updated");
        Ok(previous)
    }

    /// [`set_feed`](Self::set_feed) for the native asset.
    pub fn set_native_feed(&self, caller: &Address, feed: Address) -> Result<Address, VaultError> {
        self.set_feed(caller, AssetId::Native, feed)
    }

    // -- Queries ------------------------------------------------------------

    /// Balance of `account` in `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedAsset`] for unknown assets.
    pub fn balance_of(&self, account: &Address, asset: &AssetId) -> Result<Amount, VaultError> {
        let state = self.state.read_recursive();
        state.registry.config(asset)?;
        Ok(state.ledger.balance_of(account, asset))
    }

    /// Total held in `asset` across all accounts.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedAsset`] for unknown assets.
    pub fn reserve(&self, asset: &AssetId) -> Result<Amount, VaultError> {
        let state = self.state.read_recursive();
        state.registry.config(asset)?;
        Ok(state.ledger.reserve(asset))
    }

    /// Completed deposit and withdrawal counts for `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedAsset`] for unknown assets.
    pub fn reserve_counters(&self, asset: &AssetId) -> Result<ReserveCounters, VaultError> {
        let state = self.state.read_recursive();
        state.registry.config(asset)?;
        Ok(state.ledger.counters(asset))
    }

    /// Value of every reserve at current prices, in reference units. Owner
    /// only.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `caller` is not the owner.
    /// - Price errors for any asset with a non-zero reserve.
    pub fn total_valuation(&self, caller: &Address) -> Result<u128, VaultError> {
        self.require_owner(caller)?;
        let state = self.state.read_recursive();
        let converter = CurrencyConverter::new(&self.host, &state.registry);
        CapacityEnforcer::new(&state.registry, &converter, self.bank_cap)
            .total_valuation(|a| state.ledger.reserve(a))
    }

    /// Value of `amount` of `asset` at the current price, without moving
    /// anything.
    pub fn preview_reference_value(
        &self,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<u128, VaultError> {
        let state = self.state.read_recursive();
        CurrencyConverter::new(&self.host, &state.registry).to_reference(asset, amount)
    }

    /// The native asset followed by every registered token, in registration
    /// order.
    pub fn supported_assets(&self) -> Vec<AssetId> {
        self.state.read_recursive().registry.valuation_order().collect()
    }

    pub fn is_supported(&self, asset: &AssetId) -> bool {
        self.state.read_recursive().registry.is_supported(asset)
    }

    /// Configuration of a supported asset.
    pub fn asset_config(&self, asset: &AssetId) -> Result<AssetConfig, VaultError> {
        self.state.read_recursive().registry.config(asset).copied()
    }

    pub fn bank_cap(&self) -> u128 {
        self.bank_cap
    }

    pub fn withdrawal_limit(&self) -> u128 {
        self.limiter.limit()
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    /// Events with `seq >= from`, oldest first.
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.state.read_recursive().ledger.events_since(from)
    }

    pub fn event_count(&self) -> u64 {
        self.state.read_recursive().ledger.event_count()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read_recursive().ledger.snapshot()
    }

    /// Assets whose reserve differs from the sum of balances. Always empty
    /// unless something is badly wrong.
    pub fn audit(&self) -> Vec<AuditMismatch> {
        self.state.read_recursive().ledger.audit()
    }

    // -- Internals ----------------------------------------------------------

    fn require_owner(&self, caller: &Address) -> Result<(), VaultError> {
        if *caller != self.owner {
            return Err(VaultError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Moves `amount` from the caller into custody.
    fn pull(&self, caller: &Address, asset: &AssetId, amount: Amount) -> Result<(), VaultError> {
        match asset {
            AssetId::Native => self
                .host
                .native()
                .transfer(caller, &self.address, amount)
                .map_err(|e| {
                    tracing::warn!(account = %caller, amount, error = %e, "native value not attached");
                    VaultError::TransferFailed(*asset)
                }),
            AssetId::Token(token) => {
                let contract = self
                    .host
                    .token(token)
                    .ok_or(VaultError::AssetUnavailable(*token))?;
                match contract.transfer_from(&self.address, caller, &self.address, amount) {
                    Ok(true) => Ok(()),
                    Ok(false) => {
                        tracing::warn!(account = %caller, %token, amount, "transfer_from returned false");
                        Err(VaultError::TransferFailed(*asset))
                    }
                    Err(e) => {
                        tracing::warn!(account = %caller, %token, amount, error = %e, "transfer_from reverted");
                        Err(VaultError::TransferFailed(*asset))
                    }
                }
            }
        }
    }

    /// Pays `amount` out of custody to the caller.
    fn push(&self, caller: &Address, asset: &AssetId, amount: Amount) -> Result<(), VaultError> {
        match asset {
            AssetId::Native => self
                .host
                .native()
                .send(&self.address, caller, amount)
                .map_err(|e| {
                    tracing::warn!(account = %caller, amount, error = %e, "native payout failed");
                    VaultError::TransferFailed(*asset)
                }),
            AssetId::Token(token) => {
                let contract = self
                    .host
                    .token(token)
                    .ok_or(VaultError::TransferFailed(*asset))?;
                match contract.transfer(&self.address, caller, amount) {
                    Ok(true) => Ok(()),
                    Ok(false) => {
                        tracing::warn!(account = %caller, %token, amount, "transfer returned false");
                        Err(VaultError::TransferFailed(*asset))
                    }
                    Err(e) => {
                        tracing::warn!(account = %caller, %token, amount, error = %e, "transfer reverted");
                        Err(VaultError::TransferFailed(*asset))
                    }
                }
            }
        }
    }

    /// Best-effort return of a pulled deposit that could not be credited.
    fn refund(&self, caller: &Address, asset: &AssetId, amount: Amount) {
        let result = match asset {
            AssetId::Native => self
                .host
                .native()
                .transfer(&self.address, caller, amount)
                .is_ok(),
            AssetId::Token(token) => self
                .host
                .token(token)
                .map(|t| matches!(t.transfer(&self.address, caller, amount), Ok(true)))
                .unwrap_or(false),
        };
        if !result {
            tracing::error!(account = %caller, %asset, amount, "refund failed");
        }
    }
}

impl std::fmt::Debug for PricedVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricedVault")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("bank_cap", &self.bank_cap)
            .field("guarded", &self.guard.is_entered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_feed::MockPriceFeed;
    use chrono::Utc;
    use custodia_protocol::config::{NATIVE_UNIT, REFERENCE_UNIT};

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn setup(cap: u128) -> (Arc<Host>, PricedVault) {
        let host = Arc::new(Host::with_system_clock());
        let feed = Address::derive("feed:eth");
        host.deploy_feed(
            feed,
            Arc::new(MockPriceFeed::new("ETH / USD", 8, 2_000_00000000, Utc::now())),
        );
        host.native().credit(&alice(), 10 * NATIVE_UNIT).unwrap();

        let vault = PricedVault::new(
            host.clone(),
            VaultConfig {
                address: Address::derive("vault"),
                owner: owner(),
                native_feed: feed,
                bank_cap: cap,
            },
        )
        .unwrap();
        (host, vault)
    }

    #[test]
    fn constructor_validates_cap_and_feed() {
        let host = Arc::new(Host::with_system_clock());
        let config = VaultConfig {
            address: Address::derive("vault"),
            owner: owner(),
            native_feed: Address::derive("feed"),
            bank_cap: 0,
        };
        assert_eq!(
            PricedVault::new(host.clone(), config).unwrap_err(),
            VaultError::InvalidCapValue
        );

        let config = VaultConfig {
            native_feed: Address::ZERO,
            bank_cap: 1,
            ..config
        };
        assert_eq!(
            PricedVault::new(host, config).unwrap_err(),
            VaultError::InvalidFeed(Address::ZERO)
        );
    }

    #[test]
    fn native_deposit_moves_value_into_custody() {
        let (host, vault) = setup(100_000 * REFERENCE_UNIT);
        let receipt = vault.deposit_native(&alice(), NATIVE_UNIT).unwrap();
        assert_eq!(receipt.reference_value, 2_000 * REFERENCE_UNIT);
        assert_eq!(receipt.balance, NATIVE_UNIT);
        assert_eq!(receipt.event_seq, 0);

        assert_eq!(host.native().balance_of(&alice()), 9 * NATIVE_UNIT);
        assert_eq!(host.native().balance_of(&vault.address()), NATIVE_UNIT);
        assert_eq!(vault.reserve(&AssetId::Native).unwrap(), NATIVE_UNIT);
    }

    #[test]
    fn deposit_without_attached_value_fails_cleanly() {
        let (_host, vault) = setup(100_000 * REFERENCE_UNIT);
        let broke = Address::derive("broke");
        assert_eq!(
            vault.deposit_native(&broke, NATIVE_UNIT).unwrap_err(),
            VaultError::TransferFailed(AssetId::Native)
        );
        assert_eq!(vault.balance_of(&broke, &AssetId::Native).unwrap(), 0);
        assert_eq!(vault.event_count(), 0);
    }

    #[test]
    fn withdraw_pays_out_and_counts() {
        let (host, vault) = setup(100_000 * REFERENCE_UNIT);
        vault.deposit_native(&alice(), NATIVE_UNIT).unwrap();
        let receipt = vault.withdraw_native(&alice(), NATIVE_UNIT / 4).unwrap();
        assert_eq!(receipt.reference_value, 500 * REFERENCE_UNIT);
        assert_eq!(receipt.balance, 3 * NATIVE_UNIT / 4);
        assert_eq!(
            host.native().balance_of(&alice()),
            9 * NATIVE_UNIT + NATIVE_UNIT / 4
        );
        assert_eq!(
            vault.reserve_counters(&AssetId::Native).unwrap(),
            ReserveCounters {
                deposits: 1,
                withdrawals: 1
            }
        );
    }

    #[test]
    fn zero_amount_fails_first() {
        let (_host, vault) = setup(REFERENCE_UNIT);
        let unknown = AssetId::Token(Address::derive("nope"));
        assert_eq!(
            vault.deposit(&alice(), unknown, 0).unwrap_err(),
            VaultError::ZeroAmount
        );
        assert_eq!(
            vault.withdraw(&alice(), unknown, 0).unwrap_err(),
            VaultError::ZeroAmount
        );
    }

    #[test]
    fn privileged_operations_require_owner() {
        let (_host, vault) = setup(REFERENCE_UNIT);
        let feed = Address::derive("feed:other");
        assert_eq!(
            vault.set_native_feed(&alice(), feed).unwrap_err(),
            VaultError::Unauthorized { caller: alice() }
        );
        assert_eq!(
            vault.total_valuation(&alice()).unwrap_err(),
            VaultError::Unauthorized { caller: alice() }
        );
        assert_eq!(
            vault
                .register_asset(&alice(), Address::derive("usdc"), feed)
                .unwrap_err(),
            VaultError::Unauthorized { caller: alice() }
        );
        assert_eq!(vault.total_valuation(&owner()).unwrap(), 0);
    }

    #[test]
    fn set_feed_emits_event() {
        let (_host, vault) = setup(REFERENCE_UNIT);
        let old = Address::derive("feed:eth");
        let new = Address::derive("feed:eth2");
        assert_eq!(vault.set_native_feed(&owner(), new).unwrap(), old);
        assert_eq!(
            vault.asset_config(&AssetId::Native).unwrap().feed,
            new
        );
        assert_eq!(
            vault.set_native_feed(&owner(), Address::ZERO).unwrap_err(),
            VaultError::InvalidFeed(Address::ZERO)
        );

        let events = vault.events_since(0);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].event,
            VaultEvent::FeedUpdated { previous, feed, .. } if previous == old && feed == new
        ));
    }

    #[test]
    fn unknown_assets_rejected_by_queries() {
        let (_host, vault) = setup(REFERENCE_UNIT);
        let unknown = AssetId::Token(Address::derive("nope"));
        assert_eq!(
            vault.balance_of(&alice(), &unknown).unwrap_err(),
            VaultError::UnsupportedAsset(unknown)
        );
        assert!(vault.reserve_counters(&unknown).is_err());
        assert!(!vault.is_supported(&unknown));
        assert_eq!(vault.supported_assets(), vec![AssetId::Native]);
    }
}
