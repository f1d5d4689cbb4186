//! # oraclenet-selection
//!
//! A size-bounded membership set ordered by stake.
//!
//! Entries are kept in a vector sorted by stake descending, ties broken by
//! insertion sequence ascending. The minimum member is therefore always the
//! last element, and top-k retrieval is a prefix.
//!
//! ## Tie-breaking
//!
//! Every insertion of an identity that is not currently a member draws a
//! fresh sequence number, including re-insertion after removal. Updating
//! the stake of a current member keeps its original sequence number.

pub mod set;

pub use set::{Admission, Entry, SelectionSet};

use oraclenet_types::{Address, Amount};

/// Selection set failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The set is full and the candidate does not beat the current minimum.
    #[error("stake {stake} of {id} does not exceed the minimum member stake {minimum}")]
    StakeTooLow {
        /// Candidate identity.
        id: Address,
        /// Candidate stake.
        stake: Amount,
        /// Stake of the current minimum member, or zero for a zero-capacity set.
        minimum: Amount,
    },
}

/// Convenience result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;
