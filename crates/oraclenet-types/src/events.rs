//! Observations emitted for external indexers and monitors.
//!
//! Every successful transaction emits zero or more events into an
//! [`EventLog`]. A failed transaction emits nothing.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, PairId, PaymentId, Points};

/// All events emitted by the oracle network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // Participant lifecycle
    OracleRegistered {
        owner: Address,
        reporter: Address,
        label: String,
    },
    OracleUpdated {
        owner: Address,
        reporter: Address,
        label: String,
    },
    OracleDeregistered {
        owner: Address,
    },

    // Stake ledger
    StakeDeposited {
        owner: Address,
        amount: Amount,
        balance: Amount,
    },
    StakeWithdrawn {
        owner: Address,
        amount: Amount,
        balance: Amount,
        payment_id: PaymentId,
    },
    StakeLocked {
        owner: Address,
        until: u64,
    },

    // Subscription changes
    Subscribed {
        pair: PairId,
        participant: Address,
        stake: Amount,
    },
    Unsubscribed {
        pair: PairId,
        participant: Address,
    },
    Displaced {
        pair: PairId,
        participant: Address,
        by: Address,
    },
    RemovedForLowStake {
        pair: PairId,
        participant: Address,
        stake: Amount,
        required: Amount,
    },

    // Round lifecycle
    AdmittedToRound {
        pair: PairId,
        round: u64,
        participant: Address,
    },
    RemovedFromRound {
        pair: PairId,
        round: u64,
        participant: Address,
    },
    PointsForfeited {
        pair: PairId,
        round: u64,
        participant: Address,
        points: Points,
    },
    RewardPaid {
        pair: PairId,
        round: u64,
        participant: Address,
        amount: Amount,
    },
    RoundSwitched {
        pair: PairId,
        round: u64,
        start_block: u64,
        lock_period_end: u64,
        total_points: Points,
        distributed: Amount,
        selected: Vec<Address>,
    },

    // Price publication
    PricePublished {
        pair: PairId,
        sender: Address,
        price: u128,
        block: u64,
    },
    EmergencyPublished {
        pair: PairId,
        publisher: Address,
        price: u128,
        block: u64,
    },

    // Delayed settlement
    PaymentDeposit {
        id: PaymentId,
        source: Address,
        destination: Address,
        amount: Amount,
        expiration: u64,
    },
    PaymentWithdraw {
        id: PaymentId,
        source: Address,
        destination: Address,
        amount: Amount,
    },
    PaymentCancel {
        id: PaymentId,
        source: Address,
        destination: Address,
        amount: Amount,
    },

    // Administration
    PairRegistered {
        pair: PairId,
        reward_account: Address,
    },
    ParameterChanged {
        scope: String,
        name: String,
        value: String,
    },
}

impl Event {
    /// Short type name, matching the serialized `event` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::OracleRegistered { .. } => "oracle_registered",
            Event::OracleUpdated { .. } => "oracle_updated",
            Event::OracleDeregistered { .. } => "oracle_deregistered",
            Event::StakeDeposited { .. } => "stake_deposited",
            Event::StakeWithdrawn { .. } => "stake_withdrawn",
            Event::StakeLocked { .. } => "stake_locked",
            Event::Subscribed { .. } => "subscribed",
            Event::Unsubscribed { .. } => "unsubscribed",
            Event::Displaced { .. } => "displaced",
            Event::RemovedForLowStake { .. } => "removed_for_low_stake",
            Event::AdmittedToRound { .. } => "admitted_to_round",
            Event::RemovedFromRound { .. } => "removed_from_round",
            Event::PointsForfeited { .. } => "points_forfeited",
            Event::RewardPaid { .. } => "reward_paid",
            Event::RoundSwitched { .. } => "round_switched",
            Event::PricePublished { .. } => "price_published",
            Event::EmergencyPublished { .. } => "emergency_published",
            Event::PaymentDeposit { .. } => "payment_deposit",
            Event::PaymentWithdraw { .. } => "payment_withdraw",
            Event::PaymentCancel { .. } => "payment_cancel",
            Event::PairRegistered { .. } => "pair_registered",
            Event::ParameterChanged { .. } => "parameter_changed",
        }
    }
}

/// Append-only buffer of events produced while applying transactions.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Take all buffered events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over buffered events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tag_matches_kind() {
        let event = Event::Unsubscribed {
            pair: PairId::from_symbol("BTCUSD").expect("pair"),
            participant: Address::new([7u8; 20]),
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["event"], event.kind());
        assert_eq!(json["pair"], "BTCUSD");
    }

    #[test]
    fn test_event_log_drain() {
        let mut log = EventLog::new();
        log.emit(Event::OracleDeregistered {
            owner: Address::ZERO,
        });
        assert_eq!(log.len(), 1);
        let drained = log.drain();
        assert_eq!(drained.len(), 1);
        assert!(log.is_empty());
    }
}
