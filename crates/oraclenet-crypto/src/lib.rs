//! # oraclenet-crypto
//!
//! Cryptographic primitives for the oracle network.
//!
//! ## Modules
//!
//! - [`blake3`] - Domain-separated BLAKE3 hashing and address derivation
//! - [`ed25519`] - Ed25519 reporter keys, signing and verification
//! - [`message`] - The price message every quorum member signs

pub mod blake3;
pub mod ed25519;
pub mod message;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
