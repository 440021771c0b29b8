//! # Capacity Enforcement
//!
//! Two limits, both in reference units:
//!
//! - **Bank cap** — checked on deposit. The vault's total valuation is
//!   recomputed from scratch at current prices (native first, then every
//!   registered token in registration order, skipping empty reserves) and
//!   the deposit is refused if valuation plus the incoming value would
//!   exceed the cap. Because held reserves are re-priced on every check, a
//!   price rise on assets already in the vault consumes headroom even when
//!   nothing new arrives.
//! - **Withdrawal limit** — checked on withdrawal. A single withdrawal may
//!   not be worth more than [`WITHDRAWAL_LIMIT`].
//!
//! Equality passes in both cases.

use custodia_protocol::config::WITHDRAWAL_LIMIT;
use custodia_protocol::{Amount, AssetId};

use crate::converter::CurrencyConverter;
use crate::error::VaultError;
use crate::registry::AssetRegistry;

/// Bank-cap check over live reserves.
pub struct CapacityEnforcer<'a> {
    registry: &'a AssetRegistry,
    converter: &'a CurrencyConverter<'a>,
    cap: u128,
}

impl<'a> CapacityEnforcer<'a> {
    /// Creates an enforcer for `cap` reference units.
    pub fn new(
        registry: &'a AssetRegistry,
        converter: &'a CurrencyConverter<'a>,
        cap: u128,
    ) -> Self {
        Self {
            registry,
            converter,
            cap,
        }
    }

    /// Values every non-empty reserve at its current price.
    ///
    /// # Errors
    ///
    /// Propagates conversion errors from any asset with a non-zero reserve.
    pub fn total_valuation<R>(&self, reserve_of: R) -> Result<u128, VaultError>
    where
        R: Fn(&AssetId) -> Amount,
    {
        let mut total: u128 = 0;
        for asset in self.registry.valuation_order() {
            let reserve = reserve_of(&asset);
            if reserve == 0 {
                continue;
            }
            let value = self.converter.to_reference(&asset, reserve)?;
            total = total
                .checked_add(value)
                .ok_or(VaultError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    /// Refuses `incoming` reference units if they would exceed the cap.
    ///
    /// Returns the projected valuation on success.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::BankCapExceeded`] when over the cap.
    pub fn check_capacity<R>(&self, incoming: u128, reserve_of: R) -> Result<u128, VaultError>
    where
        R: Fn(&AssetId) -> Amount,
    {
        let current = self.total_valuation(reserve_of)?;
        let projected = current.checked_add(incoming).ok_or(VaultError::BankCapExceeded {
            cap: self.cap,
            projected: u128::MAX,
        })?;
        if projected > self.cap {
            return Err(VaultError::BankCapExceeded {
                cap: self.cap,
                projected,
            });
        }
        Ok(projected)
    }
}

/// Per-transaction withdrawal cap.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalLimiter {
    limit: u128,
}

impl WithdrawalLimiter {
    /// The standard limiter at [`WITHDRAWAL_LIMIT`].
    pub fn standard() -> Self {
        Self {
            limit: WITHDRAWAL_LIMIT,
        }
    }

    /// The limit in reference units.
    pub fn limit(&self) -> u128 {
        self.limit
    }

    /// Refuses withdrawals worth more than the limit.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::WithdrawalLimitExceeded`].
    pub fn check(&self, requested: u128) -> Result<(), VaultError> {
        if requested > self.limit {
            return Err(VaultError::WithdrawalLimitExceeded {
                limit: self.limit,
                requested,
            });
        }
        Ok(())
    }
}
