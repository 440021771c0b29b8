//! # Vault Notifications
//!
//! Every committed state change appends one [`EventRecord`] to the vault's
//! log. Records carry a gap-free sequence number so observers can tail the
//! log with [`PricedVault::events_since`](crate::vault::PricedVault::events_since).
//! A request that fails leaves no record behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custodia_protocol::types::amount_str;
use custodia_protocol::{Address, Amount, AssetId};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// A token was added to the registry.
    AssetRegistered {
        asset: AssetId,
        feed: Address,
        decimals: u8,
    },
    /// An asset's feed reference was replaced.
    FeedUpdated {
        asset: AssetId,
        previous: Address,
        feed: Address,
    },
    /// A deposit was credited.
    Deposited {
        account: Address,
        asset: AssetId,
        #[serde(with = "amount_str")]
        amount: Amount,
        #[serde(with = "amount_str")]
        reference_value: u128,
    },
    /// A withdrawal was paid out.
    Withdrawn {
        account: Address,
        asset: AssetId,
        #[serde(with = "amount_str")]
        amount: Amount,
        #[serde(with = "amount_str")]
        reference_value: u128,
    },
}

/// A sequenced, timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0.
    pub seq: u64,
    /// Host time at commit.
    pub at: DateTime<Utc>,
    /// The event itself.
    pub event: VaultEvent,
}
