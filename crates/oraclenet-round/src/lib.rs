//! # oraclenet-round
//!
//! Per-pair round lifecycle, quorum price publication and reward
//! distribution.
//!
//! ## Modules
//!
//! - [`params`] - Pair parameters and their registry keys
//! - [`round`] - The frozen selection of one round and its points
//! - [`directory`] - Reporter to participant lookups
//! - [`coordinator`] - Subscriptions, stake notifications and setters
//! - [`publication`] - Quorum and emergency publication, price reads
//! - [`rewards`] - Round switch and proportional payout
//!
//! ## Lifecycle
//!
//! A pair starts uninitialized. The first admitted subscriber opens round 1
//! with its lock period running. Once the lock period end has passed anyone
//! may switch the round: rewards are paid in proportion to points, points
//! reset, and the top `max_selected` subscribers form the next selection.

pub mod coordinator;
pub mod directory;
pub mod params;
pub mod publication;
pub mod rewards;
pub mod round;

pub use coordinator::RoundCoordinator;
pub use directory::ParticipantDirectory;
pub use params::PairParams;
pub use publication::PublishedPrice;
pub use round::{Round, RoundPhase, SelectedOracle};

use oraclenet_governance::AuthError;
use oraclenet_token::TokenError;
use oraclenet_types::{Address, PairId};

/// Round and publication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// No round has been opened for this pair yet.
    #[error("round not open")]
    RoundNotOpen,

    /// The current round's lock period has not elapsed.
    #[error("round lock period active until {lock_period_end}, now {now}")]
    LockActive {
        /// Current timestamp.
        now: u64,
        /// Lock period end timestamp.
        lock_period_end: u64,
    },

    /// Unsupported message version.
    #[error("wrong message version: expected {expected}, got {got}")]
    WrongVersion {
        /// Accepted version.
        expected: u32,
        /// Submitted version.
        got: u32,
    },

    /// The message is for another pair.
    #[error("pair mismatch: coordinator {expected}, message {got}")]
    PairMismatch {
        /// Coordinator pair.
        expected: PairId,
        /// Message pair.
        got: PairId,
    },

    /// Prices must be non-zero.
    #[error("price must be non-zero")]
    ZeroPrice,

    /// The message does not build on the last accepted publication.
    #[error("stale last publication block: expected {expected}, got {got}")]
    StaleBlock {
        /// Block of the last accepted publication.
        expected: u64,
        /// Block named by the message.
        got: u64,
    },

    /// Only the voted reporter may submit the publication.
    #[error("sender {sender} does not match voted oracle {voted}")]
    SenderMismatch {
        /// Transaction sender.
        sender: Address,
        /// Voted reporting address.
        voted: Address,
    },

    /// The voted reporter is not selected in the current round.
    #[error("voted oracle {0} is not selected in the current round")]
    VoterNotSelected(Address),

    /// Not enough signatures.
    #[error("quorum not met: {signatures} signatures for {selected} selected oracles")]
    QuorumNotMet {
        /// Signatures submitted.
        signatures: usize,
        /// Oracles selected in the round.
        selected: usize,
    },

    /// A signature does not verify against the message.
    #[error("invalid signature at position {0}")]
    InvalidSignature(usize),

    /// A signer is not selected in the current round.
    #[error("signer {0} is not selected in the current round")]
    SignerNotSelected(Address),

    /// Signer addresses are not strictly increasing.
    #[error("signatures unordered or duplicated at position {0}")]
    UnorderedOrDuplicate(usize),

    /// The voted reporter did not sign its own publication.
    #[error("voted oracle {0} is not among the signers")]
    SubmitterNotSigner(Address),

    /// Emergency publication is not open yet.
    #[error("emergency publication opens at block {opens_at}, now {now}")]
    EmergencyWindowNotReached {
        /// Current block.
        now: u64,
        /// First block accepting emergency publication.
        opens_at: u64,
    },

    /// Reward or points arithmetic overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// A parameter value violates its constraints.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Constraint that failed.
        reason: String,
    },

    /// Caller not authorized or not whitelisted.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A reward transfer failed.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Convenience result type for round operations.
pub type Result<T> = std::result::Result<T, RoundError>;
