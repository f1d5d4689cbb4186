//! # oraclenet-settlement
//!
//! Time-delayed release of withdrawn stake.
//!
//! Withdrawals never pay out directly. The staking ledger, registered here
//! as the single source delegate, deposits the funds into the settlement
//! vault as a [`PendingPayment`] that the destination can claim once its
//! expiration has passed. Until then the source delegate may cancel it and
//! take the funds back.

pub mod ledger;

pub use ledger::{DelayedSettlement, PendingPayment};

use oraclenet_token::TokenError;
use oraclenet_types::{Address, PaymentId};

/// Settlement failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    /// No payment with this id exists for the caller.
    #[error("invalid payment id {0}")]
    InvalidId(PaymentId),

    /// The payment cannot be withdrawn yet.
    #[error("payment {id} not expired: expires at {expiration}, now {now}")]
    NotExpired {
        /// Payment id.
        id: PaymentId,
        /// Absolute expiration timestamp.
        expiration: u64,
        /// Current timestamp.
        now: u64,
    },

    /// Only the registered source delegate may deposit or cancel.
    #[error("caller {caller} is not the source delegate {source_delegate}")]
    WrongSourceDelegate {
        /// Rejected caller.
        caller: Address,
        /// Registered source delegate.
        source_delegate: Address,
    },

    /// The underlying token transfer failed.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Convenience result type for settlement operations.
pub type Result<T> = std::result::Result<T, SettlementError>;
