//! Account addresses and asset pair identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Result, TypesError, ADDRESS_LEN, PAIR_ID_LEN};

/// A 20-byte account or reporter address.
///
/// Addresses order by their raw byte value. Quorum signatures must be
/// submitted in strictly increasing address order.
///
/// Serialized as its `0x`-prefixed hex [`Display`](fmt::Display) form. The
/// prefix is optional when parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of this address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Build an address from the first 20 bytes of a 32-byte digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(trimmed).map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        let bytes: [u8; ADDRESS_LEN] = raw
            .try_into()
            .map_err(|_| TypesError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 32-byte asset pair identifier, built from an ASCII symbol such as
/// `BTCUSD` right-padded with zero bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairId([u8; PAIR_ID_LEN]);

impl PairId {
    /// Build a pair identifier from its symbol.
    ///
    /// # Errors
    ///
    /// - [`TypesError::InvalidPairSymbol`] if the symbol is empty, longer than
    ///   32 bytes, or contains anything but printable ASCII
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        let valid = !symbol.is_empty()
            && symbol.len() <= PAIR_ID_LEN
            && symbol.bytes().all(|b| b.is_ascii_graphic());
        if !valid {
            return Err(TypesError::InvalidPairSymbol(symbol.to_string()));
        }
        let mut bytes = [0u8; PAIR_ID_LEN];
        bytes[..symbol.len()].copy_from_slice(symbol.as_bytes());
        Ok(Self(bytes))
    }

    /// Get the raw padded bytes.
    pub fn as_bytes(&self) -> &[u8; PAIR_ID_LEN] {
        &self.0
    }

    /// The symbol without its zero padding.
    pub fn symbol(&self) -> String {
        self.0
            .iter()
            .take_while(|b| **b != 0)
            .map(|b| *b as char)
            .collect()
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol())
    }
}

impl fmt::Debug for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairId({})", self.symbol())
    }
}

impl FromStr for PairId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_symbol(s)
    }
}

impl Serialize for PairId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.symbol())
    }
}

impl<'de> Deserialize<'de> for PairId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        PairId::from_symbol(&symbol).map_err(serde::de::Error::custom)
    }
}
