//! The sorted bounded set.

use std::cmp::Reverse;

use oraclenet_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::{Result, SelectionError};

/// One member of a [`SelectionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Participant identity.
    pub id: Address,
    /// Stake snapshot used for ordering.
    pub stake: Amount,
    /// Insertion sequence, lower is older.
    pub seq: u64,
}

impl Entry {
    fn sort_key(&self) -> (Reverse<Amount>, u64) {
        (Reverse(self.stake), self.seq)
    }
}

/// Outcome of a successful [`SelectionSet::add_or_replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A new member was added without evicting anyone.
    Inserted,
    /// An existing member's stake snapshot was updated.
    Updated,
    /// A new member was added and the previous minimum was evicted.
    Replaced(Entry),
}

/// A size-bounded stake-ordered set of participants.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    capacity: usize,
    entries: Vec<Entry>,
    next_seq: u64,
}

impl SelectionSet {
    /// Create an empty set holding at most `capacity` members.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Insert `id` with `stake`, or update its stake if already a member.
    ///
    /// When the set is full a new candidate with strictly more stake than
    /// the minimum member evicts it. An equal stake never displaces.
    ///
    /// # Errors
    ///
    /// - [`SelectionError::StakeTooLow`] if the set is full and `stake` does
    ///   not exceed the minimum member's stake
    pub fn add_or_replace(&mut self, id: Address, stake: Amount) -> Result<Admission> {
        if let Some(index) = self.index_of(&id) {
            let mut entry = self.entries.remove(index);
            entry.stake = stake;
            self.insert_sorted(entry);
            return Ok(Admission::Updated);
        }

        if self.entries.len() < self.capacity {
            let entry = self.fresh_entry(id, stake);
            self.insert_sorted(entry);
            return Ok(Admission::Inserted);
        }

        let minimum = self.get_min().map(|e| e.stake).unwrap_or(0);
        if self.capacity == 0 || stake <= minimum {
            return Err(SelectionError::StakeTooLow { id, stake, minimum });
        }

        let evicted = self.entries.pop();
        let entry = self.fresh_entry(id, stake);
        self.insert_sorted(entry);
        match evicted {
            Some(evicted) => {
                tracing::debug!(%id, evicted = %evicted.id, "selection minimum displaced");
                Ok(Admission::Replaced(evicted))
            }
            None => Ok(Admission::Inserted),
        }
    }

    /// Remove `id`, returning its entry if it was a member.
    pub fn remove(&mut self, id: &Address) -> Option<Entry> {
        self.index_of(id).map(|index| self.entries.remove(index))
    }

    /// The `k` highest-stake identities, stake descending.
    pub fn sort(&self, k: usize) -> Vec<Address> {
        self.top(k).map(|e| e.id).collect()
    }

    /// The `k` highest-stake entries, stake descending.
    pub fn top(&self, k: usize) -> impl Iterator<Item = &Entry> {
        self.entries.iter().take(k)
    }

    /// The minimum member, if any.
    pub fn get_min(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Change the capacity, evicting minimum members that no longer fit.
    ///
    /// Evicted entries are returned lowest stake first.
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<Entry> {
        self.capacity = capacity;
        let mut evicted = Vec::new();
        while self.entries.len() > capacity {
            if let Some(entry) = self.entries.pop() {
                evicted.push(entry);
            }
        }
        evicted
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: &Address) -> bool {
        self.index_of(id).is_some()
    }

    /// Stake snapshot of `id`, if a member.
    pub fn stake_of(&self, id: &Address) -> Option<Amount> {
        self.index_of(id).map(|i| self.entries[i].stake)
    }

    /// Zero-based rank of `id` in stake order.
    pub fn rank_of(&self, id: &Address) -> Option<usize> {
        self.index_of(id)
    }

    /// All entries, stake descending.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of members.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the set holds `capacity` members.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    fn index_of(&self, id: &Address) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    fn fresh_entry(&mut self, id: Address, stake: Amount) -> Entry {
        let seq = self.next_seq;
        self.next_seq += 1;
        Entry { id, stake, seq }
    }

    fn insert_sorted(&mut self, entry: Entry) {
        let key = entry.sort_key();
        let index = self.entries.partition_point(|e| e.sort_key() < key);
        self.entries.insert(index, entry);
    }
}
