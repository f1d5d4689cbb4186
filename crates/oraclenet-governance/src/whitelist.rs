//! Caller whitelists.
//!
//! Price reads and emergency publication are restricted per pair to a set
//! of whitelisted accounts managed through the authorization channel.

use std::collections::BTreeSet;

use oraclenet_types::Address;

use crate::{AdminCapability, AuthError, Result};

/// A named set of accounts allowed to call a guarded operation.
#[derive(Debug, Clone)]
pub struct Whitelist {
    name: String,
    members: BTreeSet<Address>,
}

impl Whitelist {
    /// Create an empty whitelist.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeSet::new(),
        }
    }

    /// Create a whitelist with initial members.
    pub fn with_members(name: impl Into<String>, members: impl IntoIterator<Item = Address>) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }

    /// Whitelist name, used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an account. Returns whether it was newly added.
    pub fn add(&mut self, _cap: &AdminCapability, account: Address) -> bool {
        let added = self.members.insert(account);
        if added {
            tracing::info!(list = %self.name, %account, "whitelisted");
        }
        added
    }

    /// Remove an account. Returns whether it was present.
    pub fn remove(&mut self, _cap: &AdminCapability, account: &Address) -> bool {
        let removed = self.members.remove(account);
        if removed {
            tracing::info!(list = %self.name, %account, "removed from whitelist");
        }
        removed
    }

    /// Whether `account` is whitelisted.
    pub fn contains(&self, account: &Address) -> bool {
        self.members.contains(account)
    }

    /// Check that `caller` is whitelisted.
    ///
    /// # Errors
    ///
    /// - [`AuthError::CallerNotWhitelisted`] if it is not
    pub fn check(&self, caller: &Address) -> Result<()> {
        if self.contains(caller) {
            Ok(())
        } else {
            Err(AuthError::CallerNotWhitelisted {
                caller: *caller,
                list: self.name.clone(),
            })
        }
    }

    /// Members in address order.
    pub fn members(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }
}
