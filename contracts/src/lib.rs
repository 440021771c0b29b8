//! # Custodia Contracts
//!
//! The priced vault: a custodial ledger that holds the native currency and
//! registered tokens for many accounts, values everything it holds in an
//! 8-decimal reference currency, and enforces two limits on that value:
//!
//! - **Bank cap** — total holdings at *current* prices may never exceed a
//!   cap fixed at construction. Checked on every deposit.
//! - **Withdrawal limit** — no single withdrawal may be worth more than
//!   1000 reference units.
//!
//! The vault is built from small components, each usable on its own:
//!
//! | Module        | Role                                                |
//! |---------------|-----------------------------------------------------|
//! | [`registry`]  | supported assets, their precision and price feeds   |
//! | [`oracle`]    | validated price reads (positive, not stale)         |
//! | [`converter`] | asset amount → reference units                      |
//! | [`capacity`]  | bank cap and withdrawal limit                       |
//! | [`state`]     | balances, reserves, counters, undo journal          |
//! | [`guard`]     | reentrancy flag                                     |
//! | [`vault`]     | the ledger tying it all together                    |
//!
//! ## Design Principles
//!
//! 1. All monetary arithmetic is checked. Overflow is an error, never a wrap.
//! 2. Conversions truncate toward zero and never use floating point.
//! 3. Effects before interactions: internal state changes are committed
//!    before control passes to a token or a receive hook.
//! 4. A failed request leaves no trace, including in the event log.
//!
//! [`mock_feed`] and [`mock_token`] are in-memory collaborators for tests
//! and devnets.

pub mod capacity;
pub mod converter;
pub mod error;
pub mod events;
pub mod guard;
pub mod mock_feed;
pub mod mock_token;
pub mod oracle;
pub mod registry;
pub mod state;
pub mod vault;

pub use error::VaultError;
pub use events::{EventRecord, VaultEvent};
pub use mock_feed::MockPriceFeed;
pub use mock_token::{MockToken, TransferMode};
pub use registry::AssetConfig;
pub use state::{AuditMismatch, LedgerSnapshot, ReserveCounters};
pub use vault::{PricedVault, Receipt, VaultConfig};
