//! Reporter to participant lookups.
//!
//! Signatures and publication senders are reporting addresses, while
//! selections and rewards are keyed by owner. The coordinator resolves one
//! into the other through a [`ParticipantDirectory`].

use oraclenet_staking::ParticipantRegistry;
use oraclenet_types::Address;

/// Resolves reporting addresses to participant identities.
pub trait ParticipantDirectory {
    /// Owner of the participant currently using `reporter`.
    fn owner_of_reporter(&self, reporter: &Address) -> Option<Address>;
}

impl ParticipantDirectory for ParticipantRegistry {
    fn owner_of_reporter(&self, reporter: &Address) -> Option<Address> {
        ParticipantRegistry::owner_of_reporter(self, reporter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclenet_types::EventLog;

    #[test]
    fn test_registry_resolves_reporters() {
        let mut reg = ParticipantRegistry::new();
        let mut events = EventLog::new();
        let owner = Address::new([1u8; 20]);
        let reporter = Address::new([2u8; 20]);
        reg.register(&mut events, owner, reporter, "n".into(), 0)
            .expect("register");

        let dir: &dyn ParticipantDirectory = &reg;
        assert_eq!(dir.owner_of_reporter(&reporter), Some(owner));
        assert_eq!(dir.owner_of_reporter(&owner), None);
    }
}
