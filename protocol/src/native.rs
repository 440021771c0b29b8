//! # Native Currency Bank
//!
//! The host environment's base-currency balances. The ledger never owns this
//! state; it only asks the bank to move value.
//!
//! Two kinds of movement exist:
//!
//! - [`NativeBank::transfer`] — value attached to a call. The recipient runs
//!   no code. This is how a deposit's value reaches the vault.
//! - [`NativeBank::send`] — an outbound payment. If the recipient registered
//!   a [`Receiver`], its hook runs *after* the balance has moved and may call
//!   anything, including the vault that is paying it. If the hook fails,
//!   every balance is restored to what it was before the send, including
//!   any movements the hook made, and the send reports failure.
//!
//! No lock is held while a hook runs.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{Address, Amount};

/// Errors raised by native value movements.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The payer does not hold enough native currency.
    #[error("insufficient native balance: has {balance}, needs {needed}")]
    InsufficientBalance {
        /// Payer balance.
        balance: Amount,
        /// Amount required.
        needed: Amount,
    },

    /// Crediting the recipient would overflow.
    #[error("native balance overflow")]
    Overflow,

    /// The recipient's hook rejected the payment.
    #[error("recipient rejected payment: {0}")]
    Rejected(String),
}

/// Code attached to an address that runs when it receives native value.
pub trait Receiver: Send + Sync {
    /// Called after `amount` has been credited to the receiver. Returning an
    /// error reverts the payment.
    fn on_receive(&self, from: &Address, amount: Amount) -> Result<(), String>;
}

/// Base-currency balances of every address known to the host.
#[derive(Default)]
pub struct NativeBank {
    balances: RwLock<HashMap<Address, Amount>>,
    receivers: RwLock<HashMap<Address, Arc<dyn Receiver>>>,
}

impl NativeBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the native balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.read().get(account).copied().unwrap_or(0)
    }

    /// Mints native currency to `account`. Devnet faucet and test setup only.
    pub fn credit(&self, account: &Address, amount: Amount) -> Result<Amount, NativeError> {
        let mut balances = self.balances.write();
        let entry = balances.entry(*account).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(NativeError::Overflow)?;
        Ok(*entry)
    }

    /// Installs (or replaces) the receive hook for `account`.
    pub fn set_receiver(&self, account: Address, receiver: Arc<dyn Receiver>) {
        self.receivers.write().insert(account, receiver);
    }

    /// Removes the receive hook for `account`.
    pub fn clear_receiver(&self, account: &Address) {
        self.receivers.write().remove(account);
    }

    /// Moves value attached to a call. No recipient code runs.
    pub fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), NativeError> {
        let mut balances = self.balances.write();
        Self::move_locked(&mut balances, from, to, amount)
    }

    /// Pays `to` and runs its receive hook, if any.
    ///
    /// The balance moves before the hook runs, so a hook that inspects
    /// balances sees the payment. A failing hook reverts the whole send:
    /// balances go back to the state captured before the payment, so funds
    /// the hook moved on before failing are recovered too.
    pub fn send(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), NativeError> {
        let hook = self.receivers.read().get(to).cloned();

        let checkpoint = {
            let mut balances = self.balances.write();
            let checkpoint = hook.as_ref().map(|_| balances.clone());
            Self::move_locked(&mut balances, from, to, amount)?;
            checkpoint
        };

        let (Some(hook), Some(checkpoint)) = (hook, checkpoint) else {
            return Ok(());
        };

        if let Err(reason) = hook.on_receive(from, amount) {
            *self.balances.write() = checkpoint;
            tracing::debug!(%from, %to, amount, %reason, "native payment rejected by receiver");
            return Err(NativeError::Rejected(reason));
        }

        Ok(())
    }

    fn move_locked(
        balances: &mut HashMap<Address, Amount>,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), NativeError> {
        let from_balance = balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(NativeError::InsufficientBalance {
                balance: from_balance,
                needed: amount,
            });
        }
        if from == to {
            return Ok(());
        }

        let to_balance = balances.get(to).copied().unwrap_or(0);
        let new_to = to_balance.checked_add(amount).ok_or(NativeError::Overflow)?;

        balances.insert(*from, from_balance - amount);
        balances.insert(*to, new_to);
        Ok(())
    }
}

impl std::fmt::Debug for NativeBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBank")
            .field("accounts", &self.balances.read().len())
            .field("receivers", &self.receivers.read().len())
            .finish()
    }
}
