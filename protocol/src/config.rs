//! # Ledger Configuration & Constants
//!
//! Every fixed parameter of the custody ledger lives here. The reference
//! currency precision, the native asset precision, the feed staleness bound
//! and the per-withdrawal cap are part of the ledger's contract with its
//! users; changing any of them changes what a deposit or withdrawal means.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Ledger protocol version reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Precision
// ---------------------------------------------------------------------------

/// Fractional digits of the reference currency. All cap and limit
/// comparisons happen in this unit (`1.00000000` == `100_000_000`).
pub const REFERENCE_DECIMALS: u8 = 8;

/// Fractional digits of the native asset (wei-style base unit).
pub const NATIVE_DECIMALS: u8 = 18;

/// One whole reference-currency unit in fixed-point form.
pub const REFERENCE_UNIT: u128 = 100_000_000;

/// One whole native unit in base units.
pub const NATIVE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Largest exponent accepted by the fixed-point routines. `10^38` is the
/// last power of ten that fits in a `u128`.
pub const MAX_DECIMALS: u8 = 38;

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// Maximum age of a price reading before it is rejected as stale.
pub const MAX_FEED_AGE: Duration = Duration::from_secs(30 * 60);

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Per-transaction withdrawal cap: 1000 reference units.
pub const WITHDRAWAL_LIMIT: u128 = 1_000 * REFERENCE_UNIT;

// ---------------------------------------------------------------------------
// Devnet Defaults
// ---------------------------------------------------------------------------

/// Default API port for the node.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus port for the node.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Default bank cap used by the devnet node: 100k reference units.
pub const DEFAULT_BANK_CAP: u128 = 100_000 * REFERENCE_UNIT;

/// Default native price seeded into the devnet feed: 2000.00000000.
pub const DEFAULT_NATIVE_PRICE: i128 = 2_000 * REFERENCE_UNIT as i128;

/// Decimals used by the devnet feeds. Matches the reference precision.
pub const DEFAULT_FEED_DECIMALS: u8 = 8;
