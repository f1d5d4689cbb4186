//! Pair parameters.
//!
//! Parameters are read from the configuration registry under
//! `pair.<SYMBOL>.<name>` when a pair is registered. Keys that are absent
//! fall back to the defaults below.

use oraclenet_governance::{ConfigRegistry, RegistryError};
use oraclenet_types::{Amount, PairId};
use serde::{Deserialize, Serialize};

use crate::{Result, RoundError};

/// Tunables of one pair's round coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairParams {
    /// Size of each round's frozen selection.
    #[serde(default = "default_max_selected")]
    pub max_selected: usize,

    /// Capacity of the subscribed set.
    #[serde(default = "default_max_subscribed")]
    pub max_subscribed: usize,

    /// Minimum round duration in seconds.
    #[serde(default = "default_round_lock_period_secs")]
    pub round_lock_period_secs: u64,

    /// Blocks after a publication during which the price is valid.
    #[serde(default = "default_valid_price_period_blocks")]
    pub valid_price_period_blocks: u64,

    /// Blocks without publication after which emergency publishers may publish.
    #[serde(default = "default_emergency_publishing_period_blocks")]
    pub emergency_publishing_period_blocks: u64,

    /// Minimum stake required to subscribe.
    #[serde(default)]
    pub min_subscription_stake: Amount,

    /// Price in force from pair registration until the first publication.
    /// Zero means no price.
    #[serde(default)]
    pub bootstrap_price: u128,
}

fn default_max_selected() -> usize {
    10
}

fn default_max_subscribed() -> usize {
    30
}

fn default_round_lock_period_secs() -> u64 {
    86_400
}

fn default_valid_price_period_blocks() -> u64 {
    20
}

fn default_emergency_publishing_period_blocks() -> u64 {
    20
}

impl Default for PairParams {
    fn default() -> Self {
        Self {
            max_selected: default_max_selected(),
            max_subscribed: default_max_subscribed(),
            round_lock_period_secs: default_round_lock_period_secs(),
            valid_price_period_blocks: default_valid_price_period_blocks(),
            emergency_publishing_period_blocks: default_emergency_publishing_period_blocks(),
            min_subscription_stake: 0,
            bootstrap_price: 0,
        }
    }
}

/// Registry key of a pair parameter.
pub fn registry_key(pair: &PairId, name: &str) -> String {
    format!("pair.{}.{}", pair.symbol(), name)
}

impl PairParams {
    /// Read a pair's parameters from the registry.
    ///
    /// # Errors
    ///
    /// - [`RegistryError`] if a present key holds the wrong type or range
    pub fn from_registry(
        registry: &impl ConfigRegistry,
        pair: &PairId,
    ) -> std::result::Result<Self, RegistryError> {
        let d = Self::default();
        let key = |name: &str| registry_key(pair, name);
        Ok(Self {
            max_selected: registry.get_u64_or(&key("max_selected"), d.max_selected as u64)? as usize,
            max_subscribed: registry
                .get_u64_or(&key("max_subscribed"), d.max_subscribed as u64)?
                as usize,
            round_lock_period_secs: registry
                .get_u64_or(&key("round_lock_period_secs"), d.round_lock_period_secs)?,
            valid_price_period_blocks: registry
                .get_u64_or(&key("valid_price_period_blocks"), d.valid_price_period_blocks)?,
            emergency_publishing_period_blocks: registry.get_u64_or(
                &key("emergency_publishing_period_blocks"),
                d.emergency_publishing_period_blocks,
            )?,
            min_subscription_stake: registry
                .get_uint_or(&key("min_subscription_stake"), d.min_subscription_stake)?,
            bootstrap_price: registry.get_uint_or(&key("bootstrap_price"), d.bootstrap_price)?,
        })
    }

    /// Check parameter constraints.
    ///
    /// # Errors
    ///
    /// - [`RoundError::InvalidParameter`] if `max_selected` is zero or
    ///   exceeds `max_subscribed`
    pub fn validate(&self) -> Result<()> {
        check_capacities(self.max_selected, self.max_subscribed)
    }
}

pub(crate) fn check_capacities(max_selected: usize, max_subscribed: usize) -> Result<()> {
    if max_selected == 0 {
        return Err(RoundError::InvalidParameter {
            name: "max_selected",
            reason: "must be at least 1".into(),
        });
    }
    if max_selected > max_subscribed {
        return Err(RoundError::InvalidParameter {
            name: "max_selected",
            reason: format!("{max_selected} exceeds max_subscribed {max_subscribed}"),
        });
    }
    Ok(())
}
