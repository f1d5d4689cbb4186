//! # oraclenet-network
//!
//! The explicit state store of the oracle network.
//!
//! [`Network`] owns every component: the token ledger, stake ledger,
//! participant registry, delayed settlement and one round coordinator per
//! pair. Transactions are applied one at a time through
//! [`Network::apply`]. A transaction either succeeds completely and returns
//! the events it produced, or fails and leaves the state exactly as it was.
//!
//! ## Modules
//!
//! - [`state`] - The state store, genesis and atomic application
//! - [`tx`] - Transaction and envelope types
//! - [`queries`] - Read-only views

mod fanout;
pub mod queries;
pub mod state;
pub mod tx;

pub use queries::{ParticipantInfo, RoundInfo};
pub use state::{reward_account_for, Network, DEFAULT_WITHDRAWAL_DELAY_SECS, WITHDRAWAL_DELAY_KEY};
pub use tx::{AdminAction, Envelope, Transaction};

use oraclenet_governance::{AuthError, RegistryError};
use oraclenet_round::RoundError;
use oraclenet_settlement::SettlementError;
use oraclenet_staking::{AdmissionError, StakingError};
use oraclenet_token::TokenError;
use oraclenet_types::{Address, BlockInfo, PairId};

/// Which subsystem rejected a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Admission,
    Round,
    Settlement,
    Staking,
    Authorization,
    Token,
    Config,
    Clock,
}

/// Any transaction rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No coordinator is registered for the pair.
    #[error("unknown pair {0}")]
    UnknownPair(PairId),

    /// A coordinator is already registered for the pair.
    #[error("pair {0} is already registered")]
    PairAlreadyRegistered(PairId),

    /// Module accounts hold ledger-owned funds and have no key.
    #[error("module account {0} cannot send transactions")]
    ModuleAccountSender(Address),

    /// Escrow and vault balances only move through their ledgers.
    #[error("direct transfers to module account {0} are not allowed")]
    ModuleAccountRecipient(Address),

    /// The envelope's block is earlier than the last applied one.
    #[error("clock regression: block {got:?} after {previous:?}")]
    ClockRegression {
        /// Last applied block.
        previous: BlockInfo,
        /// Rejected block.
        got: BlockInfo,
    },
}

impl ErrorCategory {
    /// Lowercase name used in logs and notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Admission => "admission",
            ErrorCategory::Round => "round",
            ErrorCategory::Settlement => "settlement",
            ErrorCategory::Staking => "staking",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Token => "token",
            ErrorCategory::Config => "config",
            ErrorCategory::Clock => "clock",
        }
    }
}

impl NetworkError {
    /// The subsystem that rejected the transaction.
    pub fn category(&self) -> ErrorCategory {
        match self {
            NetworkError::Admission(_) => ErrorCategory::Admission,
            NetworkError::Round(RoundError::Auth(_)) => ErrorCategory::Authorization,
            NetworkError::Round(RoundError::Token(_)) => ErrorCategory::Token,
            NetworkError::Round(_) => ErrorCategory::Round,
            NetworkError::Settlement(SettlementError::Token(_)) => ErrorCategory::Token,
            NetworkError::Settlement(_) => ErrorCategory::Settlement,
            NetworkError::Staking(StakingError::InsufficientBalance { .. })
            | NetworkError::Staking(StakingError::Settlement(_)) => ErrorCategory::Settlement,
            NetworkError::Staking(StakingError::Token(_)) => ErrorCategory::Token,
            NetworkError::Staking(_) => ErrorCategory::Staking,
            NetworkError::Auth(_) => ErrorCategory::Authorization,
            NetworkError::Token(_) => ErrorCategory::Token,
            NetworkError::Registry(_) => ErrorCategory::Config,
            NetworkError::UnknownPair(_) | NetworkError::PairAlreadyRegistered(_) => {
                ErrorCategory::Config
            }
            NetworkError::ModuleAccountSender(_) | NetworkError::ModuleAccountRecipient(_) => {
                ErrorCategory::Authorization
            }
            NetworkError::ClockRegression { .. } => ErrorCategory::Clock,
        }
    }
}

/// Convenience result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let insufficient: NetworkError = StakingError::InsufficientBalance {
            requested: 2,
            available: 1,
        }
        .into();
        assert_eq!(insufficient.category(), ErrorCategory::Settlement);

        let not_whitelisted: NetworkError = RoundError::Auth(AuthError::CallerNotWhitelisted {
            caller: Address::ZERO,
            list: "x".into(),
        })
        .into();
        assert_eq!(not_whitelisted.category(), ErrorCategory::Authorization);

        let quorum: NetworkError = RoundError::QuorumNotMet {
            signatures: 1,
            selected: 2,
        }
        .into();
        assert_eq!(quorum.category(), ErrorCategory::Round);
        assert_eq!(
            NetworkError::from(AdmissionError::ZeroAddress).category(),
            ErrorCategory::Admission
        );
    }
}
