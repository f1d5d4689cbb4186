//! Node configuration file.
//!
//! ```toml
//! [node]
//! event_buffer = 1000
//!
//! [genesis]
//! block_number = 0
//! timestamp = 1700000000
//! governors = ["adadadadadadadadadadadadadadadadadadadad"]
//!
//! [[genesis.balances]]
//! account = "0101010101010101010101010101010101010101"
//! amount = 1000
//!
//! [registry]
//! "staking.withdrawal_delay_secs" = 604800
//! "pair.BTCUSD.max_selected" = 3
//!
//! [[pairs]]
//! symbol = "BTCUSD"
//! price_readers = ["eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"]
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use oraclenet_governance::{MemoryRegistry, RegistryValue};
use oraclenet_round::PairParams;
use oraclenet_types::{Address, Amount, BlockInfo};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "ORACLENET_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Runtime settings.
    #[serde(default)]
    pub node: NodeSettings,
    /// Initial state.
    #[serde(default)]
    pub genesis: GenesisConfig,
    /// Named parameters readable by the network.
    #[serde(default)]
    pub registry: BTreeMap<String, toml::Value>,
    /// Pairs registered at genesis.
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Notifications buffered ahead of the printer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Only print events of these categories. Empty prints everything.
    #[serde(default)]
    pub event_categories: Vec<String>,
    /// Stop replay at the first rejected transaction.
    #[serde(default)]
    pub stop_on_error: bool,
}

/// Initial state of the network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisConfig {
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub timestamp: u64,
    /// Accounts authorized for administrative actions.
    #[serde(default)]
    pub governors: Vec<Address>,
    /// Initial token balances.
    #[serde(default)]
    pub balances: Vec<BalanceConfig>,
}

/// One initial token balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub account: Address,
    pub amount: Amount,
}

/// A pair registered at genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConfig {
    /// Pair symbol, e.g. `BTCUSD`.
    pub symbol: String,
    /// Explicit parameters. Absent means read from `[registry]`.
    #[serde(default)]
    pub params: Option<PairParams>,
    #[serde(default)]
    pub price_readers: Vec<Address>,
    #[serde(default)]
    pub emergency_publishers: Vec<Address>,
}

fn default_event_buffer() -> usize {
    1000
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            event_categories: Vec::new(),
            stop_on_error: false,
        }
    }
}

impl GenesisConfig {
    /// The block genesis is applied at.
    pub fn block(&self) -> BlockInfo {
        BlockInfo::new(self.block_number, self.timestamp)
    }
}

impl NodeConfig {
    /// Load configuration from `explicit`, the `ORACLENET_CONFIG` path, or
    /// `./oraclenet.toml`, in that order.
    ///
    /// Falls back to defaults if the resolved file does not exist.
    pub fn load(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = Self::config_path(explicit);
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::parse(&content).with_context(|| format!("parsing {}", config_path.display()))
        } else {
            tracing::warn!(path = %config_path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn config_path(explicit: Option<PathBuf>) -> PathBuf {
        if let Some(path) = explicit {
            return path;
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        PathBuf::from("oraclenet.toml")
    }

    /// Build the configuration registry from the `[registry]` table.
    ///
    /// Integers become unsigned values, strings that parse as `0x` addresses
    /// become addresses, and any other string is kept as text.
    pub fn build_registry(&self) -> anyhow::Result<MemoryRegistry> {
        let mut registry = MemoryRegistry::new();
        for (key, value) in &self.registry {
            let value = match value {
                toml::Value::Integer(i) => RegistryValue::Uint(
                    u128::try_from(*i).with_context(|| format!("registry key {key} is negative"))?,
                ),
                toml::Value::String(s) if s.starts_with("0x") => match s.parse::<Address>() {
                    Ok(address) => RegistryValue::Address(address),
                    Err(_) => RegistryValue::Text(s.clone()),
                },
                toml::Value::String(s) => RegistryValue::Text(s.clone()),
                other => anyhow::bail!("registry key {key} has unsupported type {}", other.type_str()),
            };
            registry.set(key.clone(), value);
        }
        Ok(registry)
    }
}
