//! Read-only views of network state.

use oraclenet_governance::{Governor, MemoryRegistry};
use oraclenet_round::{RoundCoordinator, RoundPhase, SelectedOracle};
use oraclenet_settlement::PendingPayment;
use oraclenet_staking::Participant;
use oraclenet_token::TokenLedger;
use oraclenet_types::{Address, Amount, BlockInfo, PairId, Points};
use serde::Serialize;

use crate::{Network, Result};

/// A participant's registration together with its stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantInfo {
    pub participant: Participant,
    pub stake: Amount,
    pub locked_until: Option<u64>,
    /// Pairs the participant is subscribed to.
    pub subscriptions: Vec<PairId>,
}

/// Snapshot of a pair's current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundInfo {
    pub pair: PairId,
    pub number: u64,
    pub start_block: u64,
    pub lock_period_end: u64,
    pub selected: Vec<SelectedOracle>,
}

impl<L: TokenLedger + Clone> Network<L> {
    /// The coordinator of `pair`.
    ///
    /// # Errors
    ///
    /// - [`crate::NetworkError::UnknownPair`] if the pair is not registered
    pub fn coordinator(&self, pair: &PairId) -> Result<&RoundCoordinator> {
        self.pair(pair)
    }

    /// Registered pairs in identifier order.
    pub fn pairs(&self) -> impl Iterator<Item = &PairId> {
        self.pairs.keys()
    }

    /// Current round number of `pair`, zero before the first admission.
    pub fn round_number(&self, pair: &PairId) -> Result<u64> {
        Ok(self.pair(pair)?.round_number())
    }

    /// Current round of `pair`, if one is open.
    pub fn round(&self, pair: &PairId) -> Result<Option<RoundInfo>> {
        Ok(self.pair(pair)?.round().map(|round| RoundInfo {
            pair: *pair,
            number: round.number,
            start_block: round.start_block,
            lock_period_end: round.lock_period_end,
            selected: round.selected().to_vec(),
        }))
    }

    /// Lifecycle phase of `pair` at `now`.
    pub fn phase(&self, pair: &PairId, now: u64) -> Result<RoundPhase> {
        Ok(self.pair(pair)?.phase(now))
    }

    /// Owners selected in the current round of `pair`.
    pub fn selected(&self, pair: &PairId) -> Result<Vec<Address>> {
        Ok(self.pair(pair)?.selected())
    }

    /// Points of `owner` in the current round of `pair`.
    pub fn points_of(&self, pair: &PairId, owner: &Address) -> Result<Option<Points>> {
        Ok(self.pair(pair)?.points_of(owner))
    }

    /// Last price of `pair` and whether it is valid at `block`.
    ///
    /// # Errors
    ///
    /// - [`crate::NetworkError::UnknownPair`] if the pair is not registered
    /// - [`crate::NetworkError::Round`] if `caller` is not a price reader
    pub fn peek(&self, pair: &PairId, caller: &Address, block: u64) -> Result<(u128, bool)> {
        Ok(self.pair(pair)?.peek(caller, block)?)
    }

    /// Last price of `pair`.
    ///
    /// # Errors
    ///
    /// - [`crate::NetworkError::UnknownPair`] if the pair is not registered
    /// - [`crate::NetworkError::Round`] if `caller` is not a price reader
    pub fn get_price(&self, pair: &PairId, caller: &Address) -> Result<u128> {
        Ok(self.pair(pair)?.get_price(caller)?)
    }

    /// Registration and stake of `owner`.
    pub fn participant(&self, owner: &Address) -> Option<ParticipantInfo> {
        let participant = self.participants.get(owner)?.clone();
        Some(ParticipantInfo {
            participant,
            stake: self.ledger.balance_of(owner),
            locked_until: self.ledger.locked_until(owner),
            subscriptions: self.subscriptions(owner),
        })
    }

    /// All registered participants.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Pairs `owner` is subscribed to.
    pub fn subscriptions(&self, owner: &Address) -> Vec<PairId> {
        self.pairs
            .iter()
            .filter(|(_, c)| c.is_subscribed(owner))
            .map(|(pair, _)| *pair)
            .collect()
    }

    /// Staked balance of `owner`.
    pub fn stake_of(&self, owner: &Address) -> Amount {
        self.ledger.balance_of(owner)
    }

    /// Stake `owner` may withdraw at timestamp `now`.
    pub fn available_stake(&self, owner: &Address, now: u64) -> Amount {
        self.ledger.available(owner, now)
    }

    /// Sum of all staked balances.
    pub fn total_staked(&self) -> Amount {
        self.ledger.total_staked()
    }

    /// Pending payments owed to `destination`.
    pub fn pending_payments(&self, destination: &Address) -> Vec<&PendingPayment> {
        self.settlement.payments_for(destination)
    }

    /// Sum of pending payments owed to `destination`.
    pub fn settlement_balance(&self, destination: &Address) -> Amount {
        self.settlement.balance_of(destination)
    }

    /// Token balance of `account`.
    pub fn token_balance(&self, account: &Address) -> Amount {
        self.token.balance_of(account)
    }

    /// Token ledger.
    pub fn token(&self) -> &L {
        &self.token
    }

    /// The governor set.
    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    /// The configuration registry the network was built with.
    pub fn registry(&self) -> &MemoryRegistry {
        &self.registry
    }

    /// Block of the last applied transaction.
    pub fn last_block(&self) -> Option<BlockInfo> {
        self.last_block
    }

    /// Account holding staked tokens.
    pub fn escrow_account(&self) -> Address {
        self.ledger.escrow()
    }

    /// Account holding tokens of pending payments.
    pub fn settlement_account(&self) -> Address {
        self.settlement.account()
    }

    /// Withdrawal delay applied to new withdrawals.
    pub fn withdrawal_delay_secs(&self) -> u64 {
        self.ledger.withdrawal_delay_secs()
    }

    /// Reward account of a registered pair.
    pub fn reward_account(&self, pair: &PairId) -> Result<Address> {
        Ok(self.pair(pair)?.reward_account())
    }

    /// Whether `account` is owned by a ledger rather than a key holder:
    /// the stake escrow, the settlement vault or a registered pair's
    /// reward account.
    pub fn is_module_account(&self, account: &Address) -> bool {
        *account == self.ledger.escrow()
            || *account == self.settlement.account()
            || self.pairs.values().any(|c| c.reward_account() == *account)
    }

    /// Fails with [`crate::NetworkError::UnknownPair`] unless `pair` is registered.
    pub fn ensure_pair(&self, pair: &PairId) -> Result<()> {
        self.pair(pair).map(|_| ())
    }
}
