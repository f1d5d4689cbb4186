//! Stake change notifications.

use oraclenet_types::{Address, Amount, EventLog};

/// Direction of a stake change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeChange {
    /// Stake grew through a deposit or a cancelled withdrawal.
    Increased,
    /// Stake shrank through a withdrawal.
    Reduced,
}

/// Receiver of stake changes.
pub trait StakeObserver {
    /// `owner`'s stake is now `stake`.
    ///
    /// Implementations refresh every selection the owner belongs to.
    /// On [`StakeChange::Reduced`] they also forfeit the owner's points in
    /// every active round and drop it where the stake fell below the
    /// subscription minimum.
    fn notify_stake_changed(
        &mut self,
        owner: &Address,
        stake: Amount,
        change: StakeChange,
        events: &mut EventLog,
    );

    /// Shorthand for a [`StakeChange::Reduced`] notification.
    fn notify_stake_reduced(&mut self, owner: &Address, stake: Amount, events: &mut EventLog) {
        self.notify_stake_changed(owner, stake, StakeChange::Reduced, events);
    }
}
