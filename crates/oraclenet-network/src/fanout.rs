//! Stake notifications fanned out to every pair.

use std::collections::BTreeMap;

use oraclenet_round::RoundCoordinator;
use oraclenet_staking::{StakeChange, StakeObserver};
use oraclenet_types::{Address, Amount, EventLog, PairId};

/// Forwards stake changes to each pair coordinator.
pub(crate) struct PairFanout<'a> {
    pub(crate) pairs: &'a mut BTreeMap<PairId, RoundCoordinator>,
}

impl StakeObserver for PairFanout<'_> {
    fn notify_stake_changed(
        &mut self,
        owner: &Address,
        stake: Amount,
        change: StakeChange,
        events: &mut EventLog,
    ) {
        for coordinator in self.pairs.values_mut() {
            coordinator.on_stake_changed(events, owner, stake, change);
        }
    }
}
