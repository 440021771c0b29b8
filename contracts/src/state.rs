//! # Ledger State
//!
//! The vault's mutable bookkeeping: per-account balances, per-asset reserves
//! and counters, and the event log. Mutations go through methods that record
//! what they overwrote in a [`Journal`], so a request that fails after it has
//! started writing can put everything back exactly as it found it.
//!
//! ## Invariant
//!
//! For every asset, `reserves[asset]` equals the sum of `balances[*][asset]`.
//! [`LedgerState::audit`] reports any asset where this does not hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use custodia_protocol::types::amount_str;
use custodia_protocol::{Address, Amount, AssetId};

use crate::error::VaultError;
use crate::events::{EventRecord, VaultEvent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Completed deposits and withdrawals for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveCounters {
    pub deposits: u64,
    pub withdrawals: u64,
}

/// Which way a balance moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Deposit,
    Withdrawal,
}

/// One asset whose reserve disagrees with the sum of its balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMismatch {
    pub asset: AssetId,
    #[serde(with = "amount_str")]
    pub reserve: Amount,
    #[serde(with = "amount_str")]
    pub balances: Amount,
}

/// Point-in-time copy of the bookkeeping, for inspection and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub reserves: BTreeMap<AssetId, String>,
    pub counters: BTreeMap<AssetId, ReserveCounters>,
    pub accounts: BTreeMap<Address, BTreeMap<AssetId, String>>,
    pub event_count: u64,
}

#[derive(Debug, Clone)]
enum UndoEntry {
    Balance {
        account: Address,
        asset: AssetId,
        previous: Option<Amount>,
    },
    Reserve {
        asset: AssetId,
        previous: Option<Amount>,
    },
    Counters {
        asset: AssetId,
        previous: Option<ReserveCounters>,
    },
    Events {
        len: usize,
    },
}

/// Record of overwritten values, replayed in reverse by
/// [`LedgerState::rollback`].
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<UndoEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// Balances, reserves, counters and events.
#[derive(Debug, Default)]
pub struct LedgerState {
    balances: HashMap<Address, HashMap<AssetId, Amount>>,
    reserves: HashMap<AssetId, Amount>,
    counters: HashMap<AssetId, ReserveCounters>,
    events: Vec<EventRecord>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account` in `asset`. Zero when never touched.
    pub fn balance_of(&self, account: &Address, asset: &AssetId) -> Amount {
        self.balances
            .get(account)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all balances in `asset`.
    pub fn reserve(&self, asset: &AssetId) -> Amount {
        self.reserves.get(asset).copied().unwrap_or(0)
    }

    pub fn counters(&self, asset: &AssetId) -> ReserveCounters {
        self.counters.get(asset).copied().unwrap_or_default()
    }

    /// Checks that a [`credit`](Self::credit) of `amount` would not overflow.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ArithmeticOverflow`].
    pub fn can_credit(
        &self,
        account: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        self.balance_of(account, asset)
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        self.reserve(asset)
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        self.counters(asset)
            .deposits
            .checked_add(1)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Adds `amount` to the account balance and the reserve, and counts one
    /// deposit.
    ///
    /// All arithmetic is checked before anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::ArithmeticOverflow`].
    pub fn credit(
        &mut self,
        journal: &mut Journal,
        account: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let balance = self
            .balance_of(account, asset)
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        let reserve = self
            .reserve(asset)
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        let counters = self.bump(asset, Direction::Deposit)?;

        self.write_balance(journal, account, asset, balance);
        self.write_reserve(journal, asset, reserve);
        self.write_counters(journal, asset, counters);
        Ok(())
    }

    /// Removes `amount` from the account balance and the reserve, and counts
    /// one withdrawal.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InsufficientFunds`] if the balance is below `amount`.
    /// - [`VaultError::ArithmeticOverflow`] if the reserve is inconsistent.
    pub fn debit(
        &mut self,
        journal: &mut Journal,
        account: &Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let available = self.balance_of(account, asset);
        let balance = available
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientFunds {
                available,
                requested: amount,
            })?;
        let reserve = self
            .reserve(asset)
            .checked_sub(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        let counters = self.bump(asset, Direction::Withdrawal)?;

        self.write_balance(journal, account, asset, balance);
        self.write_reserve(journal, asset, reserve);
        self.write_counters(journal, asset, counters);
        Ok(())
    }

    /// Appends an event stamped `at`. Returns its sequence number.
    pub fn record_event(
        &mut self,
        journal: &mut Journal,
        at: DateTime<Utc>,
        event: VaultEvent,
    ) -> u64 {
        journal.entries.push(UndoEntry::Events {
            len: self.events.len(),
        });
        let seq = self.events.len() as u64;
        self.events.push(EventRecord { seq, at, event });
        seq
    }

    /// Undoes every write recorded in `journal`, newest first.
    pub fn rollback(&mut self, journal: Journal) {
        for entry in journal.entries.into_iter().rev() {
            match entry {
                UndoEntry::Balance {
                    account,
                    asset,
                    previous,
                } => match previous {
                    Some(value) => {
                        self.balances
                            .entry(account)
                            .or_default()
                            .insert(asset, value);
                    }
                    None => {
                        if let Some(assets) = self.balances.get_mut(&account) {
                            assets.remove(&asset);
                            if assets.is_empty() {
                                self.balances.remove(&account);
                            }
                        }
                    }
                },
                UndoEntry::Reserve { asset, previous } => match previous {
                    Some(value) => {
                        self.reserves.insert(asset, value);
                    }
                    None => {
                        self.reserves.remove(&asset);
                    }
                },
                UndoEntry::Counters { asset, previous } => match previous {
                    Some(value) => {
                        self.counters.insert(asset, value);
                    }
                    None => {
                        self.counters.remove(&asset);
                    }
                },
                UndoEntry::Events { len } => self.events.truncate(len),
            }
        }
    }

    /// Events with `seq >= from`, oldest first.
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        let start = usize::try_from(from).unwrap_or(usize::MAX);
        self.events.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn event_count(&self) -> u64 {
        self.events.len() as u64
    }

    /// Assets whose reserve differs from the sum of their balances.
    pub fn audit(&self) -> Vec<AuditMismatch> {
        let mut sums: HashMap<AssetId, Amount> = HashMap::new();
        for assets in self.balances.values() {
            for (asset, amount) in assets {
                let sum = sums.entry(*asset).or_insert(0);
                *sum = sum.saturating_add(*amount);
            }
        }

        let mut seen: Vec<AssetId> = sums.keys().chain(self.reserves.keys()).copied().collect();
        seen.sort();
        seen.dedup();

        seen.into_iter()
            .filter_map(|asset| {
                let reserve = self.reserve(&asset);
                let balances = sums.get(&asset).copied().unwrap_or(0);
                (reserve != balances).then_some(AuditMismatch {
                    asset,
                    reserve,
                    balances,
                })
            })
            .collect()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            reserves: self
                .reserves
                .iter()
                .map(|(asset, amount)| (*asset, amount.to_string()))
                .collect(),
            counters: self.counters.iter().map(|(a, c)| (*a, *c)).collect(),
            accounts: self
                .balances
                .iter()
                .map(|(account, assets)| {
                    let assets = assets
                        .iter()
                        .map(|(asset, amount)| (*asset, amount.to_string()))
                        .collect();
                    (*account, assets)
                })
                .collect(),
            event_count: self.event_count(),
        }
    }

    fn bump(&self, asset: &AssetId, direction: Direction) -> Result<ReserveCounters, VaultError> {
        let mut counters = self.counters(asset);
        let slot = match direction {
            Direction::Deposit => &mut counters.deposits,
            Direction::Withdrawal => &mut counters.withdrawals,
        };
        *slot = slot.checked_add(1).ok_or(VaultError::ArithmeticOverflow)?;
        Ok(counters)
    }

    fn write_balance(
        &mut self,
        journal: &mut Journal,
        account: &Address,
        asset: &AssetId,
        value: Amount,
    ) {
        let assets = self.balances.entry(*account).or_default();
        let previous = assets.insert(*asset, value);
        journal.entries.push(UndoEntry::Balance {
            account: *account,
            asset: *asset,
            previous,
        });
    }

    fn write_reserve(&mut self, journal: &mut Journal, asset: &AssetId, value: Amount) {
        let previous = self.reserves.insert(*asset, value);
        journal.entries.push(UndoEntry::Reserve {
            asset: *asset,
            previous,
        });
    }

    fn write_counters(&mut self, journal: &mut Journal, asset: &AssetId, value: ReserveCounters) {
        let previous = self.counters.insert(*asset, value);
        journal.entries.push(UndoEntry::Counters {
            asset: *asset,
            previous,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn credit_and_debit_keep_reserve_in_step() {
        let mut state = LedgerState::new();
        let mut journal = Journal::new();
        state
            .credit(&mut journal, &alice(), &AssetId::Native, 100)
            .unwrap();
        state
            .credit(&mut journal, &bob(), &AssetId::Native, 50)
            .unwrap();
        state
            .debit(&mut journal, &alice(), &AssetId::Native, 30)
            .unwrap();

        assert_eq!(state.balance_of(&alice(), &AssetId::Native), 70);
        assert_eq!(state.reserve(&AssetId::Native), 120);
        assert_eq!(
            state.counters(&AssetId::Native),
            ReserveCounters {
                deposits: 2,
                withdrawals: 1
            }
        );
        assert!(state.audit().is_empty());
    }

    #[test]
    fn debit_beyond_balance_fails_without_writing() {
        let mut state = LedgerState::new();
        let mut journal = Journal::new();
        state
            .credit(&mut journal, &alice(), &AssetId::Native, 10)
            .unwrap();

        let mut second = Journal::new();
        let err = state
            .debit(&mut second, &alice(), &AssetId::Native, 11)
            .unwrap_err();
        assert_eq!(
            err,
            VaultError::InsufficientFunds {
                available: 10,
                requested: 11
            }
        );
        assert!(second.is_empty());
        assert_eq!(state.counters(&AssetId::Native).withdrawals, 0);
    }

    #[test]
    fn rollback_restores_exact_prior_state() {
        let mut state = LedgerState::new();
        let mut setup = Journal::new();
        state
            .credit(&mut setup, &alice(), &AssetId::Native, 100)
            .unwrap();
        let before = state.snapshot();

        let mut journal = Journal::new();
        state
            .debit(&mut journal, &alice(), &AssetId::Native, 40)
            .unwrap();
        let token = AssetId::Token(Address::derive("usdc"));
        state.credit(&mut journal, &bob(), &token, 5).unwrap();
        state.record_event(
            &mut journal,
            Utc::now(),
            VaultEvent::Withdrawn {
                account: alice(),
                asset: AssetId::Native,
                amount: 40,
                reference_value: 1,
            },
        );
        assert_eq!(state.event_count(), 1);

        state.rollback(journal);
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.balance_of(&bob(), &token), 0);
        assert_eq!(state.event_count(), 0);
    }

    #[test]
    fn credit_overflow_rejected() {
        let mut state = LedgerState::new();
        let mut journal = Journal::new();
        state
            .credit(&mut journal, &alice(), &AssetId::Native, u128::MAX)
            .unwrap();
        assert!(state.can_credit(&bob(), &AssetId::Native, 1).is_err());
        assert_eq!(
            state
                .credit(&mut journal, &bob(), &AssetId::Native, 1)
                .unwrap_err(),
            VaultError::ArithmeticOverflow
        );
        assert_eq!(state.balance_of(&bob(), &AssetId::Native), 0);
    }

    #[test]
    fn events_since_pages_the_log() {
        let mut state = LedgerState::new();
        let mut journal = Journal::new();
        for i in 0..3 {
            state.record_event(
                &mut journal,
                Utc::now(),
                VaultEvent::FeedUpdated {
                    asset: AssetId::Native,
                    previous: Address::derive(&format!("feed{i}")),
                    feed: Address::derive(&format!("feed{}", i + 1)),
                },
            );
        }
        assert_eq!(state.events_since(0).len(), 3);
        assert_eq!(state.events_since(2)[0].seq, 2);
        assert!(state.events_since(3).is_empty());
        assert!(state.events_since(u64::MAX).is_empty());
    }
}
