//! # oraclenet-governance
//!
//! The authorization channel and the configuration registry.
//!
//! Administrative operations never check the caller themselves. They take
//! an [`AdminCapability`], which can only be obtained from
//! [`authorizer::authorize`] after the configured [`Authorizer`] accepted the
//! caller.
//!
//! ## Modules
//!
//! - [`authorizer`] - Authorizer trait, governor set and admin capability
//! - [`whitelist`] - Caller whitelists for price reads and emergency publication
//! - [`registry`] - Named configuration parameters

pub mod authorizer;
pub mod registry;
pub mod whitelist;

pub use authorizer::{authorize, AdminCapability, Authorizer, Governor};
pub use registry::{ConfigRegistry, MemoryRegistry, RegistryValue};
pub use whitelist::Whitelist;

use oraclenet_types::Address;

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The caller is not accepted by the authorization channel.
    #[error("caller {0} is not authorized")]
    NotAuthorized(Address),

    /// The caller is not on the whitelist guarding this operation.
    #[error("caller {caller} is not whitelisted for {list}")]
    CallerNotWhitelisted {
        /// Rejected caller.
        caller: Address,
        /// Name of the whitelist that was checked.
        list: String,
    },
}

/// Configuration registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No value is stored under the key.
    #[error("missing registry key: {0}")]
    MissingKey(String),

    /// The stored value has a different type than requested.
    #[error("registry key {key} holds a {found}, expected {expected}")]
    WrongType {
        /// Requested key.
        key: String,
        /// Type the caller asked for.
        expected: &'static str,
        /// Type actually stored.
        found: &'static str,
    },

    /// The stored integer does not fit the requested width.
    #[error("registry key {key} is out of range: {value}")]
    OutOfRange {
        /// Requested key.
        key: String,
        /// Stored value.
        value: u128,
    },
}

/// Convenience result type for authorization checks.
pub type Result<T> = std::result::Result<T, AuthError>;
