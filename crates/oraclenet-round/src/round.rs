//! The frozen selection of one round.

use oraclenet_types::{Address, BlockInfo, Points};
use serde::{Deserialize, Serialize};

use crate::{Result, RoundError};

/// A selected participant and its points in the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOracle {
    pub owner: Address,
    pub points: Points,
}

/// One round of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round number, starting at 1.
    pub number: u64,
    /// Block the round started at.
    pub start_block: u64,
    /// Timestamp from which the round may be switched.
    pub lock_period_end: u64,
    /// Selection size frozen at round start.
    pub capacity: usize,
    selected: Vec<SelectedOracle>,
}

/// Where a pair is in its round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No participant has been admitted yet.
    Uninitialized,
    /// Round `round` is running and cannot be switched before `until`.
    LockPeriodActive { round: u64, until: u64 },
    /// Round `round` may be switched.
    Switchable { round: u64 },
}

impl Round {
    pub(crate) fn open(
        number: u64,
        block: &BlockInfo,
        lock_period_secs: u64,
        capacity: usize,
        owners: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            number,
            start_block: block.number,
            lock_period_end: block.timestamp.saturating_add(lock_period_secs),
            capacity,
            selected: owners
                .into_iter()
                .take(capacity)
                .map(|owner| SelectedOracle { owner, points: 0 })
                .collect(),
        }
    }

    /// Selected participants in admission order.
    pub fn selected(&self) -> &[SelectedOracle] {
        &self.selected
    }

    /// Selected owners in admission order.
    pub fn owners(&self) -> Vec<Address> {
        self.selected.iter().map(|s| s.owner).collect()
    }

    /// Whether `owner` is selected.
    pub fn contains(&self, owner: &Address) -> bool {
        self.selected.iter().any(|s| &s.owner == owner)
    }

    /// Points of `owner`, if selected.
    pub fn points_of(&self, owner: &Address) -> Option<Points> {
        self.selected
            .iter()
            .find(|s| &s.owner == owner)
            .map(|s| s.points)
    }

    /// Sum of all points.
    ///
    /// # Errors
    ///
    /// - [`RoundError::Overflow`] if the sum does not fit
    pub fn total_points(&self) -> Result<Points> {
        self.selected
            .iter()
            .try_fold(0 as Points, |acc, s| acc.checked_add(s.points))
            .ok_or(RoundError::Overflow)
    }

    /// Number of selected participants.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether nobody is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether another participant can join mid-round.
    pub fn has_room(&self) -> bool {
        self.selected.len() < self.capacity
    }

    pub(crate) fn admit(&mut self, owner: Address) -> bool {
        if self.contains(&owner) || !self.has_room() {
            return false;
        }
        self.selected.push(SelectedOracle { owner, points: 0 });
        true
    }

    pub(crate) fn remove(&mut self, owner: &Address) -> Option<SelectedOracle> {
        let index = self.selected.iter().position(|s| &s.owner == owner)?;
        Some(self.selected.remove(index))
    }

    /// Zero `owner`'s points, returning what was forfeited.
    pub(crate) fn forfeit(&mut self, owner: &Address) -> Points {
        match self.selected.iter_mut().find(|s| &s.owner == owner) {
            Some(s) => std::mem::take(&mut s.points),
            None => 0,
        }
    }

    pub(crate) fn add_point(&mut self, owner: &Address) -> Result<()> {
        if let Some(s) = self.selected.iter_mut().find(|s| &s.owner == owner) {
            s.points = s.points.checked_add(1).ok_or(RoundError::Overflow)?;
        }
        Ok(())
    }

    pub(crate) fn points_entries(&self) -> Vec<(Address, Points)> {
        self.selected.iter().map(|s| (s.owner, s.points)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_open_truncates_to_capacity() {
        let round = Round::open(1, &BlockInfo::new(10, 1_000), 60, 2, [addr(1), addr(2), addr(3)]);
        assert_eq!(round.owners(), vec![addr(1), addr(2)]);
        assert_eq!(round.lock_period_end, 1_060);
        assert_eq!(round.start_block, 10);
        assert!(!round.has_room());
    }

    #[test]
    fn test_admit_respects_capacity_and_duplicates() {
        let mut round = Round::open(1, &BlockInfo::new(1, 1), 0, 2, [addr(1)]);
        assert!(!round.admit(addr(1)));
        assert!(round.admit(addr(2)));
        assert!(!round.admit(addr(3)));
        assert_eq!(round.len(), 2);
    }

    #[test]
    fn test_points_and_forfeit() {
        let mut round = Round::open(1, &BlockInfo::new(1, 1), 0, 3, [addr(1), addr(2)]);
        round.add_point(&addr(1)).expect("point");
        round.add_point(&addr(1)).expect("point");
        round.add_point(&addr(2)).expect("point");
        assert_eq!(round.total_points().expect("sum"), 3);

        assert_eq!(round.forfeit(&addr(1)), 2);
        assert_eq!(round.points_of(&addr(1)), Some(0));
        assert_eq!(round.forfeit(&addr(9)), 0);
        assert_eq!(round.total_points().expect("sum"), 1);
    }
}
