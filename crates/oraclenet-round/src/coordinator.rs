//! The per-pair round coordinator.
//!
//! Holds the subscribed set, the current round and the last published
//! price. Subscriptions and stake changes arrive here from the network;
//! publication and switching live in [`crate::publication`] and
//! [`crate::rewards`].

use oraclenet_governance::{AdminCapability, Whitelist};
use oraclenet_selection::{Admission, SelectionError, SelectionSet};
use oraclenet_staking::{AdmissionError, StakeChange};
use oraclenet_types::{Address, Amount, BlockInfo, Event, EventLog, PairId, Points};

use crate::params::check_capacities;
use crate::publication::PublishedPrice;
use crate::{PairParams, Result, Round, RoundPhase};

/// Round state machine for one asset pair.
#[derive(Debug, Clone)]
pub struct RoundCoordinator {
    pub(crate) pair: PairId,
    pub(crate) reward_account: Address,
    pub(crate) params: PairParams,
    pub(crate) subscribed: SelectionSet,
    pub(crate) round: Option<Round>,
    pub(crate) price: PublishedPrice,
    pub(crate) price_readers: Whitelist,
    pub(crate) emergency_publishers: Whitelist,
}

impl RoundCoordinator {
    /// Create a coordinator registered at `block`.
    ///
    /// The bootstrap price is recorded as published at `block`.
    ///
    /// # Errors
    ///
    /// - [`crate::RoundError::InvalidParameter`] if `params` are inconsistent
    pub fn new(
        pair: PairId,
        reward_account: Address,
        params: PairParams,
        block: &BlockInfo,
    ) -> Result<Self> {
        params.validate()?;
        tracing::info!(
            %pair,
            %reward_account,
            max_selected = params.max_selected,
            max_subscribed = params.max_subscribed,
            "pair coordinator created"
        );
        Ok(Self {
            pair,
            reward_account,
            subscribed: SelectionSet::new(params.max_subscribed),
            round: None,
            price: PublishedPrice {
                value: params.bootstrap_price,
                block: block.number,
            },
            price_readers: Whitelist::new(format!("{pair} price readers")),
            emergency_publishers: Whitelist::new(format!("{pair} emergency publishers")),
            params,
        })
    }

    /// The pair this coordinator serves.
    pub fn pair(&self) -> PairId {
        self.pair
    }

    /// Account whose balance funds round rewards.
    pub fn reward_account(&self) -> Address {
        self.reward_account
    }

    /// Current parameters.
    pub fn params(&self) -> &PairParams {
        &self.params
    }

    /// The current round, if one was opened.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Current round number, zero before the first admission.
    pub fn round_number(&self) -> u64 {
        self.round.as_ref().map_or(0, |r| r.number)
    }

    /// Lifecycle phase at timestamp `now`.
    pub fn phase(&self, now: u64) -> RoundPhase {
        match &self.round {
            None => RoundPhase::Uninitialized,
            Some(r) if now < r.lock_period_end => RoundPhase::LockPeriodActive {
                round: r.number,
                until: r.lock_period_end,
            },
            Some(r) => RoundPhase::Switchable { round: r.number },
        }
    }

    /// Owners selected in the current round.
    pub fn selected(&self) -> Vec<Address> {
        self.round.as_ref().map(Round::owners).unwrap_or_default()
    }

    /// Whether `owner` is selected in the current round.
    pub fn is_selected(&self, owner: &Address) -> bool {
        self.round.as_ref().is_some_and(|r| r.contains(owner))
    }

    /// Points of `owner` in the current round.
    pub fn points_of(&self, owner: &Address) -> Option<Points> {
        self.round.as_ref().and_then(|r| r.points_of(owner))
    }

    /// Whether `owner` is in the subscribed set.
    pub fn is_subscribed(&self, owner: &Address) -> bool {
        self.subscribed.contains(owner)
    }

    /// The subscribed set.
    pub fn subscribed(&self) -> &SelectionSet {
        &self.subscribed
    }

    /// Whether `owner` is subscribed or selected.
    pub fn is_engaged(&self, owner: &Address) -> bool {
        self.is_subscribed(owner) || self.is_selected(owner)
    }

    /// Subscribe `owner` with its current `stake`.
    ///
    /// When the subscribed set is full a strictly higher stake displaces the
    /// minimum subscriber, which keeps its place in the current round until
    /// the next switch. A new subscriber joins the current round right away
    /// while the round has room; the first subscriber ever opens round 1.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::AlreadySubscribed`] if `owner` is subscribed
    /// - [`AdmissionError::NotEnoughStake`] if `stake` is below the minimum
    /// - [`AdmissionError::SelectionFull`] if the set is full and `stake`
    ///   does not exceed its minimum
    pub fn subscribe(
        &mut self,
        events: &mut EventLog,
        owner: Address,
        stake: Amount,
        block: &BlockInfo,
    ) -> std::result::Result<(), AdmissionError> {
        if self.subscribed.contains(&owner) {
            return Err(AdmissionError::AlreadySubscribed {
                participant: owner,
                pair: self.pair,
            });
        }
        if stake < self.params.min_subscription_stake {
            return Err(AdmissionError::NotEnoughStake {
                stake,
                required: self.params.min_subscription_stake,
            });
        }

        let admission = self
            .subscribed
            .add_or_replace(owner, stake)
            .map_err(|e| match e {
                SelectionError::StakeTooLow { stake, minimum, .. } => {
                    AdmissionError::SelectionFull {
                        pair: self.pair,
                        stake,
                        minimum,
                    }
                }
            })?;

        tracing::info!(pair = %self.pair, %owner, stake, "subscribed");
        events.emit(Event::Subscribed {
            pair: self.pair,
            participant: owner,
            stake,
        });
        if let Admission::Replaced(evicted) = admission {
            tracing::info!(pair = %self.pair, evicted = %evicted.id, by = %owner, "subscriber displaced");
            events.emit(Event::Displaced {
                pair: self.pair,
                participant: evicted.id,
                by: owner,
            });
        }

        self.admit_to_round(events, owner, block);
        Ok(())
    }

    /// Remove `owner` from the subscribed set.
    ///
    /// A selected participant keeps its place and points until the next
    /// switch.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotSubscribed`] if `owner` is not subscribed
    pub fn unsubscribe(
        &mut self,
        events: &mut EventLog,
        owner: Address,
    ) -> std::result::Result<(), AdmissionError> {
        if self.subscribed.remove(&owner).is_none() {
            return Err(AdmissionError::NotSubscribed {
                participant: owner,
                pair: self.pair,
            });
        }
        tracing::info!(pair = %self.pair, %owner, "unsubscribed");
        events.emit(Event::Unsubscribed {
            pair: self.pair,
            participant: owner,
        });
        Ok(())
    }

    /// React to a change of `owner`'s stake.
    ///
    /// A reduction forfeits the owner's points in the current round. A stake
    /// below the subscription minimum removes the owner from the subscribed
    /// set and from the current round, and the best subscribed participant
    /// not yet selected takes the vacant place.
    pub fn on_stake_changed(
        &mut self,
        events: &mut EventLog,
        owner: &Address,
        stake: Amount,
        change: StakeChange,
    ) {
        let below_minimum = stake < self.params.min_subscription_stake;

        if self.subscribed.contains(owner) {
            if below_minimum {
                self.subscribed.remove(owner);
                tracing::info!(pair = %self.pair, %owner, stake, "removed for low stake");
                events.emit(Event::RemovedForLowStake {
                    pair: self.pair,
                    participant: *owner,
                    stake,
                    required: self.params.min_subscription_stake,
                });
            } else if let Err(e) = self.subscribed.add_or_replace(*owner, stake) {
                // Members are always updated in place.
                tracing::warn!(pair = %self.pair, %owner, error = %e, "stake refresh rejected");
            }
        }

        let Some(round) = self.round.as_mut() else {
            return;
        };
        if !round.contains(owner) {
            return;
        }

        if change == StakeChange::Reduced {
            let points = round.forfeit(owner);
            if points > 0 {
                tracing::info!(pair = %self.pair, %owner, points, "points forfeited");
                events.emit(Event::PointsForfeited {
                    pair: self.pair,
                    round: round.number,
                    participant: *owner,
                    points,
                });
            }
        }

        if below_minimum {
            round.remove(owner);
            let number = round.number;
            events.emit(Event::RemovedFromRound {
                pair: self.pair,
                round: number,
                participant: *owner,
            });
            self.fill_vacancy(events);
        }
    }

    fn admit_to_round(&mut self, events: &mut EventLog, owner: Address, block: &BlockInfo) {
        match self.round.as_mut() {
            None => {
                let round = Round::open(
                    1,
                    block,
                    self.params.round_lock_period_secs,
                    self.params.max_selected,
                    [owner],
                );
                tracing::info!(pair = %self.pair, %owner, lock_period_end = round.lock_period_end, "round 1 opened");
                events.emit(Event::AdmittedToRound {
                    pair: self.pair,
                    round: 1,
                    participant: owner,
                });
                self.round = Some(round);
            }
            Some(round) => {
                if round.admit(owner) {
                    events.emit(Event::AdmittedToRound {
                        pair: self.pair,
                        round: round.number,
                        participant: owner,
                    });
                }
            }
        }
    }

    fn fill_vacancy(&mut self, events: &mut EventLog) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let candidate = self
            .subscribed
            .iter()
            .map(|e| e.id)
            .find(|id| !round.contains(id));
        if let Some(owner) = candidate {
            if round.admit(owner) {
                tracing::info!(pair = %self.pair, %owner, "vacancy filled");
                events.emit(Event::AdmittedToRound {
                    pair: self.pair,
                    round: round.number,
                    participant: owner,
                });
            }
        }
    }

    fn parameter_changed(&self, events: &mut EventLog, name: &str, value: String) {
        tracing::info!(pair = %self.pair, param = name, %value, "pair parameter changed");
        events.emit(Event::ParameterChanged {
            scope: self.pair.symbol(),
            name: name.to_string(),
            value,
        });
    }

    /// Change the selection size of future rounds.
    ///
    /// # Errors
    ///
    /// - [`crate::RoundError::InvalidParameter`] if zero or above `max_subscribed`
    pub fn set_max_selected(
        &mut self,
        _cap: &AdminCapability,
        events: &mut EventLog,
        value: usize,
    ) -> Result<()> {
        check_capacities(value, self.params.max_subscribed)?;
        self.params.max_selected = value;
        self.parameter_changed(events, "max_selected", value.to_string());
        Ok(())
    }

    /// Change the subscribed set capacity.
    ///
    /// Shrinking unsubscribes the lowest-stake members that no longer fit.
    /// The current round is left untouched.
    ///
    /// # Errors
    ///
    /// - [`crate::RoundError::InvalidParameter`] if below `max_selected`
    pub fn set_max_subscribed(
        &mut self,
        _cap: &AdminCapability,
        events: &mut EventLog,
        value: usize,
    ) -> Result<()> {
        check_capacities(self.params.max_selected, value)?;
        self.params.max_subscribed = value;
        for evicted in self.subscribed.set_capacity(value) {
            events.emit(Event::Unsubscribed {
                pair: self.pair,
                participant: evicted.id,
            });
        }
        self.parameter_changed(events, "max_subscribed", value.to_string());
        Ok(())
    }

    /// Change the lock period of future rounds.
    pub fn set_round_lock_period(&mut self, _cap: &AdminCapability, events: &mut EventLog, secs: u64) {
        self.params.round_lock_period_secs = secs;
        self.parameter_changed(events, "round_lock_period_secs", secs.to_string());
    }

    /// Change the price validity window.
    pub fn set_valid_price_period(
        &mut self,
        _cap: &AdminCapability,
        events: &mut EventLog,
        blocks: u64,
    ) {
        self.params.valid_price_period_blocks = blocks;
        self.parameter_changed(events, "valid_price_period_blocks", blocks.to_string());
    }

    /// Change the emergency publication window.
    pub fn set_emergency_publishing_period(
        &mut self,
        _cap: &AdminCapability,
        events: &mut EventLog,
        blocks: u64,
    ) {
        self.params.emergency_publishing_period_blocks = blocks;
        self.parameter_changed(events, "emergency_publishing_period_blocks", blocks.to_string());
    }

    /// Change the minimum subscription stake.
    ///
    /// Subscribers below the new minimum are unsubscribed with a
    /// `RemovedForLowStake` event. The current round keeps its members
    /// until the next switch.
    pub fn set_min_subscription_stake(
        &mut self,
        _cap: &AdminCapability,
        events: &mut EventLog,
        amount: Amount,
    ) {
        self.params.min_subscription_stake = amount;
        let below: Vec<(Address, Amount)> = self
            .subscribed
            .iter()
            .filter(|e| e.stake < amount)
            .map(|e| (e.id, e.stake))
            .collect();
        for (owner, stake) in below {
            self.subscribed.remove(&owner);
            tracing::info!(pair = %self.pair, %owner, stake, required = amount, "removed for low stake");
            events.emit(Event::RemovedForLowStake {
                pair: self.pair,
                participant: owner,
                stake,
                required: amount,
            });
        }
        self.parameter_changed(events, "min_subscription_stake", amount.to_string());
    }

    /// Whitelist of accounts allowed to read the price.
    pub fn price_readers_mut(&mut self) -> &mut Whitelist {
        &mut self.price_readers
    }

    /// Whitelist of accounts allowed to publish in an emergency.
    pub fn emergency_publishers_mut(&mut self) -> &mut Whitelist {
        &mut self.emergency_publishers
    }

    /// Accounts allowed to read the price.
    pub fn price_readers(&self) -> &Whitelist {
        &self.price_readers
    }

    /// Accounts allowed to publish in an emergency.
    pub fn emergency_publishers(&self) -> &Whitelist {
        &self.emergency_publishers
    }
}
