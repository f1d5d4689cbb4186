//! The price message signed by quorum members.
//!
//! ## Encoding
//!
//! ```text
//! version (u32 BE) || pair (32 bytes) || price (u128 BE) || voted reporter (20 bytes) || last publication block (u64 BE)
//! ```
//!
//! The signed digest is `BLAKE3::derive_key("oraclenet v1 price-message", encoding)`.
//! A publication replays the same fields, so every signature in a quorum
//! covers exactly the price, pair and reference block being accepted.

use oraclenet_types::{Address, PairId, ADDRESS_LEN, PAIR_ID_LEN};
use serde::{Deserialize, Serialize};

use crate::blake3::{contexts, derive_key};
use crate::ed25519::{Signature, SigningKey, VerifyingKey};
use crate::Result;

/// Length of an encoded [`PriceMessage`] in bytes.
pub const ENCODED_LEN: usize = 4 + PAIR_ID_LEN + 16 + ADDRESS_LEN + 8;

/// A price proposal for one pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMessage {
    /// Message format version.
    pub version: u32,
    /// Asset pair the price is for.
    pub pair: PairId,
    /// Proposed price.
    pub price: u128,
    /// Reporter that will submit the publication.
    pub voted_oracle: Address,
    /// Block of the last accepted publication this proposal builds on.
    pub last_publication_block: u64,
}

impl PriceMessage {
    /// Canonical byte encoding.
    pub fn encode(&self) -> [u8; ENCODED_LEN] {
        let mut out = [0u8; ENCODED_LEN];
        let mut offset = 0;
        out[offset..offset + 4].copy_from_slice(&self.version.to_be_bytes());
        offset += 4;
        out[offset..offset + PAIR_ID_LEN].copy_from_slice(self.pair.as_bytes());
        offset += PAIR_ID_LEN;
        out[offset..offset + 16].copy_from_slice(&self.price.to_be_bytes());
        offset += 16;
        out[offset..offset + ADDRESS_LEN].copy_from_slice(self.voted_oracle.as_bytes());
        offset += ADDRESS_LEN;
        out[offset..offset + 8].copy_from_slice(&self.last_publication_block.to_be_bytes());
        out
    }

    /// The digest covered by every vote on this message.
    pub fn digest(&self) -> [u8; 32] {
        derive_key(contexts::PRICE_MESSAGE, &self.encode())
    }

    /// Sign this message with a reporter key.
    pub fn sign(&self, key: &SigningKey) -> SignedVote {
        SignedVote {
            signer: key.verifying_key(),
            signature: key.sign(&self.digest()),
        }
    }
}

/// One quorum member's signature over a [`PriceMessage`] digest.
///
/// Ed25519 does not support public key recovery, so the vote carries the
/// signer's verifying key next to the signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedVote {
    /// Signer's verifying key.
    pub signer: VerifyingKey,
    /// Signature over the message digest.
    pub signature: Signature,
}

impl SignedVote {
    /// Verify the vote against a digest and return the signer's reporting
    /// address.
    ///
    /// # Errors
    ///
    /// - [`crate::CryptoError::SignatureVerification`] if the signature does
    ///   not match the digest and key
    pub fn recover_signer(&self, digest: &[u8; 32]) -> Result<Address> {
        self.signer.verify(digest, &self.signature)?;
        Ok(self.signer.address())
    }
}
