//! Stable semantic wire types shared by every component in the SDK.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::hex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Numeric EVM chain id, as carried in `eth_chainId` and EIP-155 signatures.
pub type ChainId = u64;

/// 20-byte account or contract address.
///
/// Canonical string form is `0x` followed by 40 lowercase hex characters.
/// Equality and hashing operate on the raw bytes, never on a particular
/// string rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(alloy_primitives::Address);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self(alloy_primitives::Address::ZERO);

    /// Builds an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(alloy_primitives::Address::new(bytes))
    }

    /// Returns the underlying byte array.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_ref()
    }

    /// Returns the inner `alloy_primitives::Address`.
    #[must_use]
    pub const fn inner(&self) -> alloy_primitives::Address {
        self.0
    }
}

impl From<alloy_primitives::Address> for Address {
    fn from(value: alloy_primitives::Address) -> Self {
        Self(value)
    }
}

impl From<Address> for alloy_primitives::Address {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Error returned when parsing a wire-format string fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {kind} literal: {value}")]
pub struct ParseWireError {
    kind: &'static str,
    value: String,
}

impl FromStr for Address {
    type Err = ParseWireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| ParseWireError {
            kind: "address",
            value: s.to_owned(),
        })?;
        let arr: [u8; 20] = bytes.try_into().map_err(|_| ParseWireError {
            kind: "address",
            value: s.to_owned(),
        })?;
        Ok(Self::new(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str(&raw).map_err(D::Error::custom)
    }
}

/// 32-byte hash: block hash, transaction hash, or storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(alloy_primitives::B256);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self(alloy_primitives::B256::ZERO);

    /// Builds a hash from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(alloy_primitives::B256::new(bytes))
    }

    /// Returns the underlying byte array.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }

    /// Returns the inner `alloy_primitives::B256`.
    #[must_use]
    pub const fn inner(&self) -> alloy_primitives::B256 {
        self.0
    }
}

impl From<alloy_primitives::B256> for Hash {
    fn from(value: alloy_primitives::B256) -> Self {
        Self(value)
    }
}

impl From<Hash> for alloy_primitives::B256 {
    fn from(value: Hash) -> Self {
        value.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = ParseWireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| ParseWireError {
            kind: "hash",
            value: s.to_owned(),
        })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseWireError {
            kind: "hash",
            value: s.to_owned(),
        })?;
        Ok(Self::new(arr))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str(&raw).map_err(D::Error::custom)
    }
}

/// Unsigned 256-bit integer denominated in wei.
///
/// Wire format is the shortest big-endian hex encoding; zero serializes as
/// `"0x0"`, never `"0x"` or `"0x00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Wei(alloy_primitives::U256);

impl Wei {
    /// Zero wei.
    pub const ZERO: Self = Self(alloy_primitives::U256::ZERO);

    /// Builds a `Wei` value from a `u64`.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(alloy_primitives::U256::from_limbs([value, 0, 0, 0]))
    }

    /// Returns the inner `U256`.
    #[must_use]
    pub const fn inner(&self) -> alloy_primitives::U256 {
        self.0
    }

    /// Returns `true` if this value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Minimal big-endian hex encoding, `"0x0"` for zero.
    #[must_use]
    pub fn to_hex(&self) -> String {
        if self.is_zero() {
            return "0x0".to_owned();
        }
        let bytes = self.0.to_be_bytes_vec();
        let trimmed = bytes
            .iter()
            .position(|&b| b != 0)
            .map_or(bytes.as_slice(), |i| &bytes[i..]);
        let mut hex_str = hex::encode(trimmed);
        if hex_str.starts_with('0') {
            hex_str = hex_str.trim_start_matches('0').to_owned();
            if hex_str.is_empty() {
                hex_str = "0".to_owned();
            }
        }
        format!("0x{hex_str}")
    }
}

impl From<alloy_primitives::U256> for Wei {
    fn from(value: alloy_primitives::U256) -> Self {
        Self(value)
    }
}

impl From<Wei> for alloy_primitives::U256 {
    fn from(value: Wei) -> Self {
        value.0
    }
}

impl From<u64> for Wei {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Wei {
    type Err = ParseWireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let padded = if stripped.len() % 2 == 0 {
            stripped.to_owned()
        } else {
            format!("0{stripped}")
        };
        let bytes = hex::decode(&padded).map_err(|_| ParseWireError {
            kind: "wei",
            value: s.to_owned(),
        })?;
        Ok(Self(alloy_primitives::U256::from_be_slice(&bytes)))
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str(&raw).map_err(D::Error::custom)
    }
}

/// Variable-length byte string, serialized as `0x`-prefixed hex.
///
/// An empty value serializes as `"0x"`, not `"0x0"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HexData(Vec<u8>);

impl HexData {
    /// The empty byte string.
    pub const EMPTY: Self = Self(Vec::new());

    /// Builds a `HexData` from owned bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes `self`, returning the owned bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns `true` if this value carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<u8>> for HexData {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<HexData> for Vec<u8> {
    fn from(value: HexData) -> Self {
        value.0
    }
}

impl fmt::Display for HexData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for HexData {
    type Err = ParseWireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        if stripped.is_empty() {
            return Ok(Self::EMPTY);
        }
        let bytes = hex::decode(stripped).map_err(|_| ParseWireError {
            kind: "hex data",
            value: s.to_owned(),
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for HexData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str(&raw).map_err(D::Error::custom)
    }
}

/// A block reference: one of the named tags, or a specific block number.
///
/// The source protocol sometimes prefers a named tag even when a numeric
/// form is available; both surfaces are preserved rather than collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTag {
    /// The most recently mined block.
    Latest,
    /// The block currently being assembled (not yet mined).
    Pending,
    /// The genesis block.
    Earliest,
    /// The most recent finalized block.
    Finalized,
    /// The most recent safe (justified) block.
    Safe,
    /// A specific block number.
    Number(u64),
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Pending => write!(f, "pending"),
            Self::Earliest => write!(f, "earliest"),
            Self::Finalized => write!(f, "finalized"),
            Self::Safe => write!(f, "safe"),
            Self::Number(n) => write!(f, "0x{n:x}"),
        }
    }
}

impl Serialize for BlockTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "latest" => Ok(Self::Latest),
            "pending" => Ok(Self::Pending),
            "earliest" => Ok(Self::Earliest),
            "finalized" => Ok(Self::Finalized),
            "safe" => Ok(Self::Safe),
            other => {
                let stripped = other.strip_prefix("0x").unwrap_or(other);
                u64::from_str_radix(stripped, 16)
                    .map(Self::Number)
                    .map_err(D::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wei_zero_is_0x0() {
        assert_eq!(Wei::ZERO.to_hex(), "0x0");
        assert_eq!(Wei::ZERO.to_string(), "0x0");
    }

    #[test]
    fn wei_minimal_hex_round_trips() {
        let w = Wei::from_u64(0x1234);
        assert_eq!(w.to_hex(), "0x1234");
        assert_eq!(Wei::from_str("0x1234").unwrap(), w);
    }

    #[test]
    fn hex_data_empty_is_0x() {
        assert_eq!(HexData::EMPTY.to_string(), "0x");
        assert!(HexData::from_str("0x").unwrap().is_empty());
    }

    #[test]
    fn address_round_trips_lowercase() {
        let addr = Address::from_str("0x742D35CC6634C0532925A3B844BC9E7595F0BEB4").unwrap();
        assert_eq!(addr.to_string(), "0x742d35cc6634c0532925a3b844bc9e7595f0beb4");
    }

    #[test]
    fn block_tag_named_round_trips() {
        let tag = BlockTag::Latest;
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"latest\"");
        let back: BlockTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn block_tag_numeric_round_trips() {
        let tag = BlockTag::Number(0x10);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"0x10\"");
        let back: BlockTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }
}
