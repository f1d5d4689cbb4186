//! Transaction and envelope types.
//!
//! These are the only way to change network state. They serialize as
//! externally tagged JSON objects, one per line in a transaction log:
//!
//! ```text
//! {"sender":"0x0101010101010101010101010101010101010101","block":{"number":7,"timestamp":1700000070},"tx":{"subscribe":{"pair":"BTCUSD"}}}
//! ```

use oraclenet_crypto::message::{PriceMessage, SignedVote};
use oraclenet_round::PairParams;
use oraclenet_types::{Address, Amount, BlockInfo, PairId, PaymentId};
use serde::{Deserialize, Serialize};

/// A transaction with its sender and inclusion block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: Address,
    pub block: BlockInfo,
    pub tx: Transaction,
}

impl Envelope {
    /// Wrap a transaction.
    pub fn new(sender: Address, block: BlockInfo, tx: Transaction) -> Self {
        Self { sender, block, tx }
    }
}

/// A state transition requested by `sender`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transaction {
    /// Move tokens to another account.
    Transfer { to: Address, amount: Amount },
    /// Allow `spender` to move up to `amount` of the sender's tokens.
    /// Deposits spend the allowance granted to the stake escrow.
    Approve { spender: Address, amount: Amount },
    /// Move tokens into a pair's reward account.
    FundRewards { pair: PairId, amount: Amount },

    /// Register the sender as an oracle owner.
    RegisterOracle { reporter: Address, label: String },
    /// Remove the sender's registration.
    DeregisterOracle,
    /// Replace the sender's label.
    SetOracleLabel { label: String },
    /// Replace the sender's reporting address.
    SetOracleReporter { reporter: Address },

    /// Stake tokens.
    Deposit { amount: Amount },
    /// Withdraw stake into delayed settlement.
    Withdraw { amount: Amount },
    /// Cancel a pending withdrawal and re-stake it.
    CancelWithdrawal { payment_id: PaymentId },
    /// Claim an expired pending payment.
    ClaimPayment { payment_id: PaymentId },

    /// Subscribe the sender to a pair.
    Subscribe { pair: PairId },
    /// Unsubscribe the sender from a pair.
    Unsubscribe { pair: PairId },

    /// Switch a pair's round.
    SwitchRound { pair: PairId },
    /// Publish a quorum-signed price. The sender is the voted reporter.
    Publish {
        message: PriceMessage,
        votes: Vec<SignedVote>,
    },
    /// Publish a price as an emergency publisher.
    EmergencyPublish { pair: PairId, price: u128 },

    /// An administrative action, authorized against the governor set.
    Admin(AdminAction),
}

/// Administrative actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    /// Register a pair. Parameters default to the configuration registry.
    RegisterPair {
        pair: PairId,
        #[serde(default)]
        params: Option<PairParams>,
    },
    SetMaxSelected { pair: PairId, value: usize },
    SetMaxSubscribed { pair: PairId, value: usize },
    SetRoundLockPeriod { pair: PairId, secs: u64 },
    SetValidPricePeriod { pair: PairId, blocks: u64 },
    SetEmergencyPublishingPeriod { pair: PairId, blocks: u64 },
    SetMinSubscriptionStake { pair: PairId, amount: Amount },
    AddPriceReader { pair: PairId, account: Address },
    RemovePriceReader { pair: PairId, account: Address },
    AddEmergencyPublisher { pair: PairId, account: Address },
    RemoveEmergencyPublisher { pair: PairId, account: Address },
    /// Lock an owner's whole stake until a timestamp.
    LockStake { owner: Address, until: u64 },
    SetWithdrawalDelay { secs: u64 },
    AddGovernor { account: Address },
    RemoveGovernor { account: Address },
    /// Create tokens.
    Mint { to: Address, amount: Amount },
}

impl Transaction {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Transfer { .. } => "transfer",
            Transaction::Approve { .. } => "approve",
            Transaction::FundRewards { .. } => "fund_rewards",
            Transaction::RegisterOracle { .. } => "register_oracle",
            Transaction::DeregisterOracle => "deregister_oracle",
            Transaction::SetOracleLabel { .. } => "set_oracle_label",
            Transaction::SetOracleReporter { .. } => "set_oracle_reporter",
            Transaction::Deposit { .. } => "deposit",
            Transaction::Withdraw { .. } => "withdraw",
            Transaction::CancelWithdrawal { .. } => "cancel_withdrawal",
            Transaction::ClaimPayment { .. } => "claim_payment",
            Transaction::Subscribe { .. } => "subscribe",
            Transaction::Unsubscribe { .. } => "unsubscribe",
            Transaction::SwitchRound { .. } => "switch_round",
            Transaction::Publish { .. } => "publish",
            Transaction::EmergencyPublish { .. } => "emergency_publish",
            Transaction::Admin(_) => "admin",
        }
    }
}
