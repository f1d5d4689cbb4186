//! The externally supplied clock.
//!
//! Lock periods, price validity and payment expiration are all compared
//! against a block number and timestamp handed in with every transaction.
//! Nothing in the core reads wall-clock time.

use serde::{Deserialize, Serialize};

use crate::Address;

/// Block number and timestamp at which a transaction is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block height.
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

impl BlockInfo {
    /// Create a block reference.
    pub const fn new(number: u64, timestamp: u64) -> Self {
        Self { number, timestamp }
    }

    /// Whether `self` is not earlier than `previous` in either dimension.
    pub fn follows(&self, previous: &BlockInfo) -> bool {
        self.number >= previous.number && self.timestamp >= previous.timestamp
    }
}

/// Sender and block of the transaction being applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// The account that submitted the transaction.
    pub sender: Address,
    /// The block the transaction is included in.
    pub block: BlockInfo,
}

impl TxContext {
    /// Create a transaction context.
    pub const fn new(sender: Address, block: BlockInfo) -> Self {
        Self { sender, block }
    }

    /// Current block height.
    pub fn now_block(&self) -> u64 {
        self.block.number
    }

    /// Current timestamp in seconds.
    pub fn now(&self) -> u64 {
        self.block.timestamp
    }
}
