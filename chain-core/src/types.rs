//! Basic ledger types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::{CoreError, CoreResult};

/// Block number type (64-bit unsigned integer)
pub type BlockNumber = u64;

/// Gas amount type
pub type Gas = u64;

/// Wei amount type (smallest unit of currency)
pub type Wei = u128;

/// Nonce type for transactions
pub type Nonce = u64;

/// 32-byte hash type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Create a new hash from byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Keccak-256 digest of `data`
    pub fn from_data(data: &[u8]) -> Self {
        let digest = Keccak256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(digest.as_slice());
        Self(bytes)
    }

    /// Get the underlying byte array
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Zero hash (all bytes are 0)
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// 20-byte address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Length of an address in bytes
    pub const LEN: usize = 20;

    /// Create a new address from byte array
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address from the trailing 20 bytes of `slice`, left-padding
    /// shorter inputs with zeros.
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut bytes = [0u8; 20];
        if slice.len() >= Self::LEN {
            bytes.copy_from_slice(&slice[slice.len() - Self::LEN..]);
        } else {
            bytes[Self::LEN - slice.len()..].copy_from_slice(slice);
        }
        Self(bytes)
    }

    /// Get the underlying byte array
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to hex string (no prefix)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Strict hex parsing: exactly 40 hex digits, optional `0x` prefix
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        let digits = strip_hex_prefix(hex);
        let bytes = hex::decode(digits)?;
        if bytes.len() != Self::LEN {
            return Err(CoreError::InvalidAddress(hex.to_string()));
        }
        Ok(Self::from_slice(&bytes))
    }

    /// Lenient hex parsing used for addresses embedded in payloads.
    ///
    /// Accepts an optional `0x` prefix and surrounding whitespace, an odd
    /// number of digits, and any length: longer inputs keep their last 20
    /// bytes, shorter ones are left-padded. Non-hex characters are an error.
    pub fn parse_lenient(input: &str) -> CoreResult<Self> {
        let digits = strip_hex_prefix(input.trim());
        let bytes = if digits.len() % 2 == 1 {
            hex::decode(format!("0{digits}"))?
        } else {
            hex::decode(digits)?
        };
        Ok(Self::from_slice(&bytes))
    }

    /// Zero address (all bytes are 0)
    pub const fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Addresses travel as `0x`-prefixed hex in JSON responses and TOML config.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
