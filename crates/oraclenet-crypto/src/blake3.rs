//! Domain-separated BLAKE3 hashing.
//!
//! Every derivation uses BLAKE3's key derivation mode with one of the
//! registered context strings below, so a digest produced for one purpose
//! can never be replayed as another.

use oraclenet_types::Address;

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const REPORTER_ADDRESS: &str = "oraclenet v1 reporter-address";
    pub const PRICE_MESSAGE: &str = "oraclenet v1 price-message";
    pub const MODULE_ACCOUNT: &str = "oraclenet v1 module-account";

    /// All registered context strings.
    pub const ALL_CONTEXTS: &[&str] = &[REPORTER_ADDRESS, PRICE_MESSAGE, MODULE_ACCOUNT];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Address of an internal module account (staking escrow, settlement
/// vault, pair reward pools).
///
/// `address = BLAKE3::derive_key("oraclenet v1 module-account", label)[:20]`
pub fn module_address(label: &[u8]) -> Address {
    Address::from_digest(&derive_key(contexts::MODULE_ACCOUNT, label))
}
