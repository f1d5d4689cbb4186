//! Named configuration parameters.
//!
//! Components read their tunables from a [`ConfigRegistry`] by key. Keys are
//! dotted paths such as `staking.withdrawal_delay_secs` or
//! `pair.BTCUSD.max_selected`.

use std::collections::BTreeMap;

use oraclenet_types::Address;
use serde::{Deserialize, Serialize};

use crate::RegistryError;

/// A value stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryValue {
    Uint(u128),
    Text(String),
    Address(Address),
}

impl RegistryValue {
    fn type_name(&self) -> &'static str {
        match self {
            RegistryValue::Uint(_) => "uint",
            RegistryValue::Text(_) => "text",
            RegistryValue::Address(_) => "address",
        }
    }
}

/// Read access to named configuration parameters.
pub trait ConfigRegistry {
    /// Look up a raw value.
    fn get(&self, key: &str) -> Option<&RegistryValue>;

    /// Look up an unsigned integer.
    fn get_uint(&self, key: &str) -> Result<u128, RegistryError> {
        match self.get(key) {
            Some(RegistryValue::Uint(v)) => Ok(*v),
            Some(other) => Err(RegistryError::WrongType {
                key: key.to_string(),
                expected: "uint",
                found: other.type_name(),
            }),
            None => Err(RegistryError::MissingKey(key.to_string())),
        }
    }

    /// Look up an unsigned integer that must fit in 64 bits.
    fn get_u64(&self, key: &str) -> Result<u64, RegistryError> {
        let value = self.get_uint(key)?;
        u64::try_from(value).map_err(|_| RegistryError::OutOfRange {
            key: key.to_string(),
            value,
        })
    }

    /// Look up an address.
    fn get_address(&self, key: &str) -> Result<Address, RegistryError> {
        match self.get(key) {
            Some(RegistryValue::Address(a)) => Ok(*a),
            Some(other) => Err(RegistryError::WrongType {
                key: key.to_string(),
                expected: "address",
                found: other.type_name(),
            }),
            None => Err(RegistryError::MissingKey(key.to_string())),
        }
    }

    /// Look up an unsigned integer, falling back to `default` when absent.
    fn get_u64_or(&self, key: &str, default: u64) -> Result<u64, RegistryError> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => self.get_u64(key),
        }
    }

    /// Look up an unsigned integer, falling back to `default` when absent.
    fn get_uint_or(&self, key: &str, default: u128) -> Result<u128, RegistryError> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => self.get_uint(key),
        }
    }
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    values: BTreeMap<String, RegistryValue>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: RegistryValue) -> Option<RegistryValue> {
        let key = key.into();
        tracing::debug!(%key, ?value, "registry value set");
        self.values.insert(key, value)
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegistryValue)> {
        self.values.iter()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigRegistry for MemoryRegistry {
    fn get(&self, key: &str) -> Option<&RegistryValue> {
        self.values.get(key)
    }
}
