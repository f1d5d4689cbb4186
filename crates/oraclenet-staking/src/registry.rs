//! Participant registration.
//!
//! A participant is identified by its owning account. The reporting
//! address is the key it signs price messages with and must be unique
//! among registered participants.

use std::collections::BTreeMap;

use oraclenet_types::{Address, Event, EventLog};
use serde::{Deserialize, Serialize};

use crate::AdmissionError;

type Result<T> = std::result::Result<T, AdmissionError>;

/// A registered oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Owning account, also the participant's identity.
    pub owner: Address,
    /// Address derived from the reporting key.
    pub reporter: Address,
    /// Free-form label, usually the node's public endpoint.
    pub label: String,
    /// Block number of registration.
    pub registered_at: u64,
}

/// All registered participants.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    participants: BTreeMap<Address, Participant>,
    by_reporter: BTreeMap<Address, Address>,
}

impl ParticipantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `owner` with a reporting address and label.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::ZeroAddress`] if either address is zero
    /// - [`AdmissionError::OwnerAlreadyRegistered`] if `owner` is registered
    /// - [`AdmissionError::ReporterAlreadyRegistered`] if `reporter` is in use
    pub fn register(
        &mut self,
        events: &mut EventLog,
        owner: Address,
        reporter: Address,
        label: String,
        block: u64,
    ) -> Result<()> {
        if owner == Address::ZERO || reporter == Address::ZERO {
            return Err(AdmissionError::ZeroAddress);
        }
        if self.participants.contains_key(&owner) {
            return Err(AdmissionError::OwnerAlreadyRegistered(owner));
        }
        if self.by_reporter.contains_key(&reporter) {
            return Err(AdmissionError::ReporterAlreadyRegistered(reporter));
        }

        self.by_reporter.insert(reporter, owner);
        self.participants.insert(
            owner,
            Participant {
                owner,
                reporter,
                label: label.clone(),
                registered_at: block,
            },
        );
        tracing::info!(%owner, %reporter, %label, "oracle registered");
        events.emit(Event::OracleRegistered {
            owner,
            reporter,
            label,
        });
        Ok(())
    }

    /// Remove `owner`.
    ///
    /// `engaged` tells whether the owner is still subscribed to a pair or
    /// selected in an active round.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotRegistered`] if `owner` is not registered
    /// - [`AdmissionError::NotReady`] if `engaged` is true
    pub fn deregister(
        &mut self,
        events: &mut EventLog,
        owner: Address,
        engaged: bool,
    ) -> Result<Participant> {
        if !self.participants.contains_key(&owner) {
            return Err(AdmissionError::NotRegistered(owner));
        }
        if engaged {
            return Err(AdmissionError::NotReady(owner));
        }
        let participant = self
            .participants
            .remove(&owner)
            .ok_or(AdmissionError::NotRegistered(owner))?;
        self.by_reporter.remove(&participant.reporter);

        tracing::info!(%owner, "oracle deregistered");
        events.emit(Event::OracleDeregistered { owner });
        Ok(participant)
    }

    /// Replace `owner`'s label.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotRegistered`] if `owner` is not registered
    pub fn set_label(&mut self, events: &mut EventLog, owner: Address, label: String) -> Result<()> {
        let participant = self
            .participants
            .get_mut(&owner)
            .ok_or(AdmissionError::NotRegistered(owner))?;
        participant.label = label;
        events.emit(Event::OracleUpdated {
            owner,
            reporter: participant.reporter,
            label: participant.label.clone(),
        });
        Ok(())
    }

    /// Point `owner` at a new reporting address.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::NotRegistered`] if `owner` is not registered
    /// - [`AdmissionError::ZeroAddress`] if `reporter` is zero
    /// - [`AdmissionError::ReporterAlreadyRegistered`] if another
    ///   participant uses `reporter`
    pub fn set_reporter(
        &mut self,
        events: &mut EventLog,
        owner: Address,
        reporter: Address,
    ) -> Result<()> {
        if reporter == Address::ZERO {
            return Err(AdmissionError::ZeroAddress);
        }
        match self.by_reporter.get(&reporter) {
            Some(existing) if *existing != owner => {
                return Err(AdmissionError::ReporterAlreadyRegistered(reporter))
            }
            _ => {}
        }
        let participant = self
            .participants
            .get_mut(&owner)
            .ok_or(AdmissionError::NotRegistered(owner))?;

        self.by_reporter.remove(&participant.reporter);
        participant.reporter = reporter;
        self.by_reporter.insert(reporter, owner);

        tracing::info!(%owner, %reporter, "reporting address changed");
        events.emit(Event::OracleUpdated {
            owner,
            reporter,
            label: participant.label.clone(),
        });
        Ok(())
    }

    /// Look up a participant by owner.
    pub fn get(&self, owner: &Address) -> Option<&Participant> {
        self.participants.get(owner)
    }

    /// Owner of the participant using `reporter`.
    pub fn owner_of_reporter(&self, reporter: &Address) -> Option<Address> {
        self.by_reporter.get(reporter).copied()
    }

    /// Whether `owner` is registered.
    pub fn is_registered(&self, owner: &Address) -> bool {
        self.participants.contains_key(owner)
    }

    /// All participants in owner order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether no participant is registered.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
