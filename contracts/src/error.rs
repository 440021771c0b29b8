//! # Ledger Errors
//!
//! Every failure the vault can report. All of them are local, synchronous
//! and non-retryable: the request is aborted, state is left exactly as it
//! was, and the caller gets enough context (amounts, limits, the asset) to
//! decide what to do next without re-deriving it.

use custodia_protocol::{Address, Amount, AssetId};
use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The amount argument is zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The asset is neither native nor registered.
    #[error("unsupported asset: {0}")]
    UnsupportedAsset(AssetId),

    /// The asset is already supported (or is the native sentinel).
    #[error("asset already supported: {0}")]
    AlreadySupported(AssetId),

    /// A null feed reference was supplied.
    #[error("invalid price feed reference: {0}")]
    InvalidFeed(Address),

    /// The feed reports a non-positive price or its last update is older
    /// than the staleness threshold.
    #[error("invalid or stale price for {asset}")]
    InvalidOrStalePrice {
        /// Asset whose feed was rejected.
        asset: AssetId,
    },

    /// The deposit would push total valuation above the cap.
    #[error("bank cap exceeded: cap {cap}, valuation after deposit {projected}")]
    BankCapExceeded {
        /// The cap, in reference units.
        cap: u128,
        /// Valuation the deposit would have produced, in reference units.
        projected: u128,
    },

    /// A single withdrawal's reference value exceeds the fixed cap.
    #[error("withdrawal limit exceeded: limit {limit}, requested {requested}")]
    WithdrawalLimitExceeded {
        /// The per-transaction limit, in reference units.
        limit: u128,
        /// The withdrawal's value, in reference units.
        requested: u128,
    },

    /// The account's balance is below the requested amount.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Current balance, native units of the asset.
        available: Amount,
        /// Requested amount, native units of the asset.
        requested: Amount,
    },

    /// An inbound or outbound transfer signalled failure.
    #[error("transfer failed for {0}")]
    TransferFailed(AssetId),

    /// The cap was zero at construction.
    #[error("bank cap must be greater than zero")]
    InvalidCapValue,

    /// A privileged operation was called by someone other than the owner.
    #[error("unauthorized caller: {caller}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
    },

    /// A guarded operation was entered while another one was in progress.
    #[error("reentrant call rejected")]
    ReentrantCall,

    /// No token contract is deployed at the address being registered.
    #[error("no token contract at {0}")]
    AssetUnavailable(Address),

    /// No feed contract is deployed at the configured feed address.
    #[error("no price feed contract at {0}")]
    FeedUnavailable(Address),

    /// Fixed-point or balance arithmetic would overflow.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,
}

impl VaultError {
    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::ZeroAmount => "ZeroAmount",
            VaultError::UnsupportedAsset(_) => "UnsupportedAsset",
            VaultError::AlreadySupported(_) => "AlreadySupported",
            VaultError::InvalidFeed(_) => "InvalidFeed",
            VaultError::InvalidOrStalePrice { .. } => "InvalidOrStalePrice",
            VaultError::BankCapExceeded { .. } => "BankCapExceeded",
            VaultError::WithdrawalLimitExceeded { .. } => "WithdrawalLimitExceeded",
            VaultError::InsufficientFunds { .. } => "InsufficientFunds",
            VaultError::TransferFailed(_) => "TransferFailed",
            VaultError::InvalidCapValue => "InvalidCapValue",
            VaultError::Unauthorized { .. } => "Unauthorized",
            VaultError::ReentrantCall => "ReentrantCall",
            VaultError::AssetUnavailable(_) => "AssetUnavailable",
            VaultError::FeedUnavailable(_) => "FeedUnavailable",
            VaultError::ArithmeticOverflow => "ArithmeticOverflow",
        }
    }
}
