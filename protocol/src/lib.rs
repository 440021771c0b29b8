// Copyright (c) 2026 Custodia Contributors. MIT License.
// See LICENSE for details.

//! # Custodia Protocol — Core Primitives
//!
//! Custodia is a custodial multi-asset ledger: it holds deposits of a native
//! currency and any number of registered tokens, values them in a fixed-point
//! reference currency using live price feeds, and refuses business that would
//! push its total exposure past a cap.
//!
//! This crate holds the pieces every other crate agrees on. The ledger itself
//! lives in `custodia-contracts`.
//!
//! ## Modules
//!
//! - **config** — Precision, staleness and limit constants.
//! - **types** — Addresses, asset identifiers and amounts.
//! - **fixed** — The single fixed-point conversion routine.
//! - **clock** — Time source, so staleness can be tested.
//! - **feed** — Price feed capability (latest-round reads).
//! - **token** — Token capability (pull, push, metadata).
//! - **native** — The host's base-currency balances and receive hooks.
//! - **host** — Directory resolving feed/token addresses to live contracts.
//!
//! ## Ground Rules
//!
//! 1. All amounts are integers in the asset's smallest unit. No floats.
//! 2. Every external contract is untrusted. Failure comes as `Ok(false)` or
//!    `Err(_)`, and a call may re-enter whoever made it.
//! 3. The ledger stores addresses, never handles. Resolution is per call.

pub mod clock;
pub mod config;
pub mod feed;
pub mod fixed;
pub mod host;
pub mod native;
pub mod token;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use feed::{FeedError, PriceFeed, RoundData};
pub use host::Host;
pub use native::{NativeBank, NativeError, Receiver};
pub use token::{Token, TokenError};
pub use types::{Address, Amount, AssetId, ParseIdError};
