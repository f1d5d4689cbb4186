//! # oraclenet-staking
//!
//! Oracle collateral and lifecycle.
//!
//! ## Modules
//!
//! - [`ledger`] - Deposited stake, locks and delayed withdrawal
//! - [`registry`] - Participant registration and reporting addresses
//! - [`observer`] - Notifications to per-pair coordinators on stake changes
//!
//! The ledger does not know about pairs or rounds. Every stake change is
//! reported through a [`StakeObserver`], which the network implements by
//! fanning out to each pair the participant is subscribed to.

pub mod ledger;
pub mod observer;
pub mod registry;

pub use ledger::StakeLedger;
pub use observer::{StakeChange, StakeObserver};
pub use registry::{Participant, ParticipantRegistry};

use oraclenet_settlement::SettlementError;
use oraclenet_token::TokenError;
use oraclenet_types::{Address, Amount, PairId};

/// Participant admission failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// Stake is below the pair's minimum subscription stake.
    #[error("not enough stake: {stake} < required {required}")]
    NotEnoughStake {
        /// Participant stake.
        stake: Amount,
        /// Pair minimum.
        required: Amount,
    },

    /// Already subscribed to this pair.
    #[error("{participant} is already subscribed to {pair}")]
    AlreadySubscribed {
        /// Participant identity.
        participant: Address,
        /// Pair.
        pair: PairId,
    },

    /// Not subscribed to this pair.
    #[error("{participant} is not subscribed to {pair}")]
    NotSubscribed {
        /// Participant identity.
        participant: Address,
        /// Pair.
        pair: PairId,
    },

    /// The owner already has a registered participant.
    #[error("owner {0} is already registered")]
    OwnerAlreadyRegistered(Address),

    /// Another registered participant uses this reporting address.
    #[error("reporting address {0} is already in use")]
    ReporterAlreadyRegistered(Address),

    /// No participant is registered for this owner.
    #[error("{0} is not registered")]
    NotRegistered(Address),

    /// Deregistration attempted while still subscribed or selected.
    #[error("{0} is not ready to be removed")]
    NotReady(Address),

    /// Owner or reporting address is the zero address.
    #[error("zero address is not a valid participant address")]
    ZeroAddress,

    /// The subscribed set is full and the stake does not beat its minimum.
    #[error("subscription list of {pair} is full: stake {stake} does not exceed {minimum}")]
    SelectionFull {
        /// Pair.
        pair: PairId,
        /// Participant stake.
        stake: Amount,
        /// Minimum subscribed stake.
        minimum: Amount,
    },
}

/// Stake ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    /// Withdrawal exceeds the unlocked balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount requested.
        requested: Amount,
        /// Amount currently withdrawable.
        available: Amount,
    },

    /// A lock may only be extended.
    #[error("lock of {owner} already extends to {current}, cannot shorten to {requested}")]
    LockShortened {
        /// Locked account.
        owner: Address,
        /// Current lock end.
        current: u64,
        /// Requested lock end.
        requested: u64,
    },

    /// Stake balance would overflow.
    #[error("stake balance overflow for {0}")]
    Overflow(Address),

    /// The settlement ledger rejected the operation.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// The token ledger rejected the transfer.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Convenience result type for stake ledger operations.
pub type Result<T> = std::result::Result<T, StakingError>;
