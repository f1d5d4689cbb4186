//! Authorizer trait, governor set and admin capability.

use std::collections::BTreeSet;

use oraclenet_types::Address;

use crate::{AuthError, Result};

/// The authorization channel consulted before any administrative change.
pub trait Authorizer {
    /// Whether `caller` may perform administrative operations.
    fn is_authorized(&self, caller: &Address) -> bool;
}

/// Proof that the authorization channel accepted a caller.
///
/// The field is private, so a capability cannot be built outside this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCapability {
    granted_to: Address,
}

impl AdminCapability {
    /// The account the capability was issued to.
    pub fn granted_to(&self) -> Address {
        self.granted_to
    }
}

/// Ask `authorizer` for an [`AdminCapability`] on behalf of `caller`.
///
/// # Errors
///
/// - [`AuthError::NotAuthorized`] if the authorizer rejects the caller
pub fn authorize(authorizer: &impl Authorizer, caller: Address) -> Result<AdminCapability> {
    if !authorizer.is_authorized(&caller) {
        tracing::warn!(%caller, "administrative call rejected");
        return Err(AuthError::NotAuthorized(caller));
    }
    Ok(AdminCapability { granted_to: caller })
}

/// A fixed set of governor accounts.
#[derive(Debug, Clone, Default)]
pub struct Governor {
    owners: BTreeSet<Address>,
}

impl Governor {
    /// Create a governor set from its initial members.
    pub fn new(owners: impl IntoIterator<Item = Address>) -> Self {
        Self {
            owners: owners.into_iter().collect(),
        }
    }

    /// Add a governor.
    pub fn add_owner(&mut self, _cap: &AdminCapability, owner: Address) {
        if self.owners.insert(owner) {
            tracing::info!(%owner, "governor added");
        }
    }

    /// Remove a governor. Returns whether it was present.
    pub fn remove_owner(&mut self, _cap: &AdminCapability, owner: &Address) -> bool {
        let removed = self.owners.remove(owner);
        if removed {
            tracing::info!(%owner, "governor removed");
        }
        removed
    }

    /// Current governors in address order.
    pub fn owners(&self) -> impl Iterator<Item = &Address> {
        self.owners.iter()
    }

    /// Number of governors.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether there are no governors.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl Authorizer for Governor {
    fn is_authorized(&self, caller: &Address) -> bool {
        self.owners.contains(caller)
    }
}
