//! # Identities & Asset Identifiers
//!
//! An [`Address`] is an opaque 20-byte identity. Accounts, token contracts,
//! price feeds and the vault itself are all addressed the same way; the host
//! environment authenticates callers and hands the ledger their address.
//!
//! An [`AssetId`] is either the native sentinel or the address of a token
//! contract. Both serialize as strings (`"native"` / `"0x…"`) so that they can
//! be used as JSON map keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An amount in the smallest unit of some asset.
pub type Amount = u128;

/// Errors produced when parsing addresses or asset identifiers.
#[derive(Debug, Error, PartialEq)]
pub enum ParseIdError {
    /// The hex payload could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded payload is not exactly 20 bytes.
    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte identity, displayed as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The null reference. Never a valid feed or token.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for the null reference.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derives a stable address from a human-readable label.
    ///
    /// The address is the first 20 bytes of `BLAKE3(label)`, so the same
    /// label always lands on the same address. Used to place devnet
    /// contracts at predictable locations.
    pub fn derive(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest.as_bytes()[..20]);
        Self(out)
    }

    /// Returns the `0x`-prefixed hex encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses a hex address, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        if bytes.len() != 20 {
            return Err(ParseIdError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}…)", &self.to_hex()[..10])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Identifies an asset the ledger can hold.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetId {
    /// The host environment's base currency. Always supported.
    Native,
    /// A token contract deployed at the given address.
    Token(Address),
}

impl AssetId {
    /// Returns `true` for the native sentinel.
    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }

    /// Returns the token address, or `None` for the native asset.
    pub fn token_address(&self) -> Option<Address> {
        match self {
            AssetId::Native => None,
            AssetId::Token(addr) => Some(*addr),
        }
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => write!(f, "Native"),
            AssetId::Token(addr) => write!(f, "Token({})", addr),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => f.write_str("native"),
            AssetId::Token(addr) => write!(f, "{}", addr),
        }
    }
}

impl FromStr for AssetId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("native") {
            return Ok(AssetId::Native);
        }
        Address::from_hex(s).map(AssetId::Token)
    }
}

impl From<Address> for AssetId {
    fn from(addr: Address) -> Self {
        AssetId::Token(addr)
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Serde helper: amounts as decimal strings
// ---------------------------------------------------------------------------

/// Serializes `u128` amounts as decimal strings.
///
/// JSON numbers lose precision past 2^53 in most clients and `serde_json`
/// cannot represent values past `u64::MAX` in a `Value`. Wei-denominated
/// balances cross both lines routinely, so every amount that leaves the
/// process as JSON goes through this module.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Receipt {
///     #[serde(with = "custodia_protocol::types::amount_str")]
///     amount: u128,
/// }
/// ```
pub mod amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::derive("alice").is_zero());
    }

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(Address::derive("feed:native"), Address::derive("feed:native"));
        assert_ne!(Address::derive("feed:native"), Address::derive("feed:usdc"));
    }

    #[test]
    fn hex_accepts_optional_prefix() {
        let addr = Address::derive("bob");
        let with = addr.to_hex();
        let without = with.trim_start_matches("0x");
        assert_eq!(Address::from_hex(&with).unwrap(), addr);
        assert_eq!(Address::from_hex(without).unwrap(), addr);
    }

    #[test]
    fn wrong_length_rejected() {
        let err = Address::from_hex("0xdeadbeef").unwrap_err();
        assert_eq!(err, ParseIdError::InvalidLength(4));
    }

    #[test]
    fn asset_id_parses_native_and_tokens() {
        assert_eq!("native".parse::<AssetId>().unwrap(), AssetId::Native);
        assert_eq!("NATIVE".parse::<AssetId>().unwrap(), AssetId::Native);

        let token = Address::derive("usdc");
        let parsed: AssetId = token.to_hex().parse().unwrap();
        assert_eq!(parsed, AssetId::Token(token));
        assert_eq!(parsed.token_address(), Some(token));
        assert_eq!(AssetId::Native.token_address(), None);
    }

    #[test]
    fn asset_ids_work_as_json_map_keys() {
        use std::collections::BTreeMap;

        let mut map = BTreeMap::new();
        map.insert(AssetId::Native, 1u64);
        map.insert(AssetId::Token(Address::derive("usdc")), 2u64);

        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"native\""));
        let back: BTreeMap<AssetId, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn amounts_serialize_as_strings() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Wrapper {
            #[serde(with = "amount_str")]
            amount: u128,
        }

        let w = Wrapper {
            amount: 100_000_000_000_000_000_000,
        };
        let json = serde_json::to_string(&w).unwrap();
        assert_eq!(json, r#"{"amount":"100000000000000000000"}"#);
        assert_eq!(serde_json::from_str::<Wrapper>(&json).unwrap(), w);
    }
}
