//! # oraclenet-types
//!
//! Shared domain types used across the oraclenet workspace: account and
//! pair identifiers, the externally supplied block clock, and the events
//! emitted for indexers and monitors.

pub mod address;
pub mod block;
pub mod events;

pub use address::{Address, PairId};
pub use block::{BlockInfo, TxContext};
pub use events::{Event, EventLog};

/// Token amounts, in the smallest indivisible unit.
pub type Amount = u128;

/// Identifier of a pending payment in the delayed settlement ledger.
pub type PaymentId = u64;

/// Per-round reward points.
pub type Points = u64;

/// Length of an account or reporter address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Length of an asset pair identifier in bytes.
pub const PAIR_ID_LEN: usize = 32;

/// The only price message version accepted by round coordinators.
pub const PROTOCOL_VERSION: u32 = 3;

/// Error types for parsing shared identifiers.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// Pair symbol is empty, too long, or not printable ASCII.
    #[error("invalid pair symbol: {0:?}")]
    InvalidPairSymbol(String),

    /// Address string is not 20 hex-encoded bytes.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
}

/// Convenience result type for identifier parsing.
pub type Result<T> = std::result::Result<T, TypesError>;
