//! Quorum and emergency publication, price reads.
//!
//! A publication is accepted when more than half of the round's selected
//! participants signed the same [`PriceMessage`], the voted reporter
//! submits it and has signed it itself, and the signer addresses are
//! strictly increasing. Checks run in a fixed order and nothing changes
//! until all of them pass.

use oraclenet_crypto::message::{PriceMessage, SignedVote};
use oraclenet_types::{Address, Event, EventLog, TxContext, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};

use crate::{ParticipantDirectory, Result, RoundCoordinator, RoundError};

/// The last accepted price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPrice {
    /// Price value, zero if none was ever published.
    pub value: u128,
    /// Block the price was accepted at.
    pub block: u64,
}

impl RoundCoordinator {
    /// The last accepted price, unguarded.
    pub fn published(&self) -> PublishedPrice {
        self.price
    }

    /// Block of the last accepted publication.
    pub fn last_publication_block(&self) -> u64 {
        self.price.block
    }

    /// Whether the last price is still valid at block `now`.
    pub fn is_price_valid(&self, now: u64) -> bool {
        self.price.value != 0
            && now < self.price.block.saturating_add(self.params.valid_price_period_blocks)
    }

    /// Accept a price signed by a quorum of the current round.
    ///
    /// On success the price and the current block are recorded and every
    /// signer earns one point.
    ///
    /// # Errors
    ///
    /// In order of evaluation:
    ///
    /// - [`RoundError::RoundNotOpen`] before the first admission
    /// - [`RoundError::WrongVersion`], [`RoundError::PairMismatch`],
    ///   [`RoundError::ZeroPrice`], [`RoundError::StaleBlock`]
    /// - [`RoundError::SenderMismatch`] unless the sender is the voted reporter
    /// - [`RoundError::VoterNotSelected`]
    /// - [`RoundError::QuorumNotMet`] unless signatures exceed half the selection
    /// - per signature: [`RoundError::InvalidSignature`],
    ///   [`RoundError::SignerNotSelected`], [`RoundError::UnorderedOrDuplicate`]
    /// - [`RoundError::SubmitterNotSigner`]
    pub fn publish(
        &mut self,
        directory: &impl ParticipantDirectory,
        events: &mut EventLog,
        ctx: &TxContext,
        message: &PriceMessage,
        votes: &[SignedVote],
    ) -> Result<()> {
        let round = self.round.as_ref().ok_or(RoundError::RoundNotOpen)?;

        if message.version != PROTOCOL_VERSION {
            return Err(RoundError::WrongVersion {
                expected: PROTOCOL_VERSION,
                got: message.version,
            });
        }
        if message.pair != self.pair {
            return Err(RoundError::PairMismatch {
                expected: self.pair,
                got: message.pair,
            });
        }
        if message.price == 0 {
            return Err(RoundError::ZeroPrice);
        }
        if message.last_publication_block != self.price.block {
            return Err(RoundError::StaleBlock {
                expected: self.price.block,
                got: message.last_publication_block,
            });
        }
        if ctx.sender != message.voted_oracle {
            return Err(RoundError::SenderMismatch {
                sender: ctx.sender,
                voted: message.voted_oracle,
            });
        }
        let selected_owner = |reporter: &Address| {
            directory
                .owner_of_reporter(reporter)
                .filter(|owner| round.contains(owner))
        };
        if selected_owner(&message.voted_oracle).is_none() {
            return Err(RoundError::VoterNotSelected(message.voted_oracle));
        }
        if votes.len() * 2 <= round.len() {
            return Err(RoundError::QuorumNotMet {
                signatures: votes.len(),
                selected: round.len(),
            });
        }

        let digest = message.digest();
        let mut signer_owners = Vec::with_capacity(votes.len());
        let mut previous: Option<Address> = None;
        let mut submitter_signed = false;
        for (index, vote) in votes.iter().enumerate() {
            let signer = vote
                .recover_signer(&digest)
                .map_err(|_| RoundError::InvalidSignature(index))?;
            let owner = selected_owner(&signer).ok_or(RoundError::SignerNotSelected(signer))?;
            if previous.is_some_and(|p| signer <= p) {
                return Err(RoundError::UnorderedOrDuplicate(index));
            }
            previous = Some(signer);
            submitter_signed |= signer == message.voted_oracle;
            signer_owners.push(owner);
        }
        if !submitter_signed {
            return Err(RoundError::SubmitterNotSigner(message.voted_oracle));
        }
        for owner in &signer_owners {
            round
                .points_of(owner)
                .and_then(|p| p.checked_add(1))
                .ok_or(RoundError::Overflow)?;
        }

        let number = round.number;
        if let Some(round) = self.round.as_mut() {
            for owner in &signer_owners {
                round.add_point(owner)?;
            }
        }
        self.price = PublishedPrice {
            value: message.price,
            block: ctx.now_block(),
        };

        tracing::info!(
            pair = %self.pair,
            round = number,
            price = message.price,
            signers = signer_owners.len(),
            block = ctx.now_block(),
            "price published"
        );
        events.emit(Event::PricePublished {
            pair: self.pair,
            sender: ctx.sender,
            price: message.price,
            block: ctx.now_block(),
        });
        Ok(())
    }

    /// Publish a price without quorum once no publication happened for
    /// `emergency_publishing_period_blocks`.
    ///
    /// # Errors
    ///
    /// - [`RoundError::Auth`] if the sender is not an emergency publisher
    /// - [`RoundError::ZeroPrice`] if `price` is zero
    /// - [`RoundError::EmergencyWindowNotReached`] if too few blocks passed
    pub fn emergency_publish(
        &mut self,
        events: &mut EventLog,
        ctx: &TxContext,
        price: u128,
    ) -> Result<()> {
        self.emergency_publishers.check(&ctx.sender)?;
        if price == 0 {
            return Err(RoundError::ZeroPrice);
        }
        let opens_at = self
            .price
            .block
            .saturating_add(self.params.emergency_publishing_period_blocks);
        if ctx.now_block() < opens_at {
            return Err(RoundError::EmergencyWindowNotReached {
                now: ctx.now_block(),
                opens_at,
            });
        }

        self.price = PublishedPrice {
            value: price,
            block: ctx.now_block(),
        };
        tracing::warn!(pair = %self.pair, publisher = %ctx.sender, price, "emergency price published");
        events.emit(Event::EmergencyPublished {
            pair: self.pair,
            publisher: ctx.sender,
            price,
            block: ctx.now_block(),
        });
        Ok(())
    }

    /// Last price and whether it is still valid at block `now`.
    ///
    /// # Errors
    ///
    /// - [`RoundError::Auth`] if `caller` is not a whitelisted reader
    pub fn peek(&self, caller: &Address, now: u64) -> Result<(u128, bool)> {
        self.price_readers.check(caller)?;
        Ok((self.price.value, self.is_price_valid(now)))
    }

    /// Last price.
    ///
    /// # Errors
    ///
    /// - [`RoundError::Auth`] if `caller` is not a whitelisted reader
    pub fn get_price(&self, caller: &Address) -> Result<u128> {
        self.price_readers.check(caller)?;
        Ok(self.price.value)
    }
}
