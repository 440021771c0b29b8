//! # Token Capability
//!
//! The ledger talks to external token contracts through [`Token`]. The
//! interface mirrors the subset of a fungible-token standard the ledger
//! needs: metadata, a pull (`transfer_from`) and a push (`transfer`).
//!
//! Tokens are untrusted. A transfer can fail in two ways and the ledger must
//! treat both as failure:
//!
//! - it returns `Ok(false)` (non-reverting failure signal), or
//! - it returns `Err(_)` (reverting failure).
//!
//! A transfer can also run arbitrary code before returning, including calls
//! back into the ledger. The ledger guards against that; implementors are
//! free to be hostile.

use thiserror::Error;

use crate::types::{Address, Amount};

/// Reverting failures raised by a token contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The sender does not hold enough tokens.
    #[error("insufficient token balance: has {balance}, needs {needed}")]
    InsufficientBalance {
        /// Current holder balance.
        balance: Amount,
        /// Amount the transfer required.
        needed: Amount,
    },

    /// The spender's allowance is too small.
    #[error("insufficient allowance: approved {allowance}, needs {needed}")]
    InsufficientAllowance {
        /// Current allowance.
        allowance: Amount,
        /// Amount the transfer required.
        needed: Amount,
    },

    /// Arithmetic overflow inside the token.
    #[error("token balance overflow")]
    Overflow,

    /// Any other revert, including reverts raised by callback code.
    #[error("token reverted: {0}")]
    Reverted(String),
}

/// A fungible token contract.
pub trait Token: Send + Sync {
    /// Fractional digits of the token's base unit.
    fn decimals(&self) -> u8;

    /// Ticker symbol.
    fn symbol(&self) -> String;

    /// Balance held by `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Moves `amount` from `sender` (the calling contract) to `to`.
    fn transfer(&self, sender: &Address, to: &Address, amount: Amount) -> Result<bool, TokenError>;

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance previously granted by `from`.
    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, TokenError>;
}
