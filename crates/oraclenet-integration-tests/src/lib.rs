//! Scenario fixtures for the oraclenet workspace.
//!
//! The tests under `tests/` drive a [`Network`] exclusively through
//! transactions, the same way a replayed transaction log would. This
//! library provides deterministic identities and a [`Harness`] that keeps
//! the block clock moving forward.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p oraclenet-integration-tests
//! ```

use oraclenet_crypto::ed25519::KeyPair;
use oraclenet_crypto::message::{PriceMessage, SignedVote};
use oraclenet_governance::{Governor, MemoryRegistry};
use oraclenet_network::{AdminAction, Envelope, Network, NetworkError, Transaction};
use oraclenet_round::PairParams;
use oraclenet_token::{MemoryToken, TokenLedger};
use oraclenet_types::{Address, Amount, BlockInfo, Event, PairId, PROTOCOL_VERSION};

/// Governor of every harness network.
pub const GOVERNOR: Address = Address::new([0xad; 20]);

/// Whitelisted price reader of every harness pair.
pub const READER: Address = Address::new([0xee; 20]);

/// Genesis timestamp.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Seconds between consecutive harness blocks.
pub const BLOCK_SECS: u64 = 10;

/// Tokens minted to every oracle owner and to the governor.
pub const INITIAL_BALANCE: Amount = 1_000_000;

/// A participant with a deterministic owner account and reporting key.
pub struct Oracle {
    pub owner: Address,
    pub keys: KeyPair,
}

impl Oracle {
    /// Oracle derived from a one-byte seed.
    pub fn new(seed: u8) -> Self {
        Self {
            owner: Address::new([seed; 20]),
            keys: KeyPair::from_bytes(&[seed; 32]),
        }
    }

    /// Address derived from the reporting key.
    pub fn reporter(&self) -> Address {
        self.keys.address()
    }
}

/// Parse a pair symbol.
pub fn pair(symbol: &str) -> PairId {
    PairId::from_symbol(symbol).expect("valid pair symbol")
}

/// Sign `message` with every signer, ordered by reporting address.
pub fn signed_votes(message: &PriceMessage, signers: &[&Oracle]) -> Vec<SignedVote> {
    let mut sorted: Vec<&&Oracle> = signers.iter().collect();
    sorted.sort_by_key(|o| o.reporter());
    sorted
        .into_iter()
        .map(|o| message.sign(&o.keys.signing_key))
        .collect()
}

/// A network plus a clock that only moves forward.
pub struct Harness {
    pub network: Network,
    pub block: BlockInfo,
}

impl Harness {
    /// Genesis with `oracles` funded and no pairs.
    pub fn new(oracles: &[&Oracle]) -> Self {
        Self::with_registry(oracles, MemoryRegistry::new())
    }

    /// Genesis with `oracles` funded and a custom registry.
    pub fn with_registry(oracles: &[&Oracle], registry: MemoryRegistry) -> Self {
        let mut token = MemoryToken::new();
        for account in oracles.iter().map(|o| o.owner).chain([GOVERNOR]) {
            token
                .mint(account, INITIAL_BALANCE)
                .expect("genesis mint should succeed");
        }
        let network = Network::new(token, Governor::new([GOVERNOR]), registry)
            .expect("genesis should succeed");
        Self {
            network,
            block: BlockInfo::new(0, GENESIS_TIME),
        }
    }

    /// Register `pair` with `params` and whitelist [`READER`].
    pub fn register_pair(&mut self, pair: PairId, params: PairParams) -> Result<(), NetworkError> {
        self.send(
            GOVERNOR,
            Transaction::Admin(AdminAction::RegisterPair {
                pair,
                params: Some(params),
            }),
        )?;
        self.send(
            GOVERNOR,
            Transaction::Admin(AdminAction::AddPriceReader {
                pair,
                account: READER,
            }),
        )?;
        Ok(())
    }

    /// Move the clock forward.
    pub fn advance(&mut self, blocks: u64, secs: u64) -> BlockInfo {
        self.block = BlockInfo::new(self.block.number + blocks, self.block.timestamp + secs);
        self.block
    }

    /// Apply `tx` from `sender` in the next block.
    pub fn send(&mut self, sender: Address, tx: Transaction) -> Result<Vec<Event>, NetworkError> {
        let block = self.advance(1, BLOCK_SECS);
        self.network.apply(&Envelope::new(sender, block, tx))
    }

    /// Register `oracle`, stake `stake` and subscribe it to `pair`.
    pub fn onboard(&mut self, oracle: &Oracle, stake: Amount, pair: PairId) -> Result<Vec<Event>, NetworkError> {
        let mut events = self.send(
            oracle.owner,
            Transaction::RegisterOracle {
                reporter: oracle.reporter(),
                label: format!("oracle {}", oracle.owner),
            },
        )?;
        events.extend(self.deposit(oracle.owner, stake)?);
        events.extend(self.send(oracle.owner, Transaction::Subscribe { pair })?);
        Ok(events)
    }

    /// Approve the stake escrow for `amount` and deposit it, in two blocks.
    pub fn deposit(&mut self, owner: Address, amount: Amount) -> Result<Vec<Event>, NetworkError> {
        let spender = self.network.escrow_account();
        let mut events = self.send(owner, Transaction::Approve { spender, amount })?;
        events.extend(self.send(owner, Transaction::Deposit { amount })?);
        Ok(events)
    }

    /// Message proposing `price` for `pair`, voted to `voted`, built on the
    /// pair's last publication.
    pub fn message(&self, pair: PairId, price: u128, voted: &Oracle) -> Result<PriceMessage, NetworkError> {
        let last_publication_block = self.network.coordinator(&pair)?.last_publication_block();
        Ok(PriceMessage {
            version: PROTOCOL_VERSION,
            pair,
            price,
            voted_oracle: voted.reporter(),
            last_publication_block,
        })
    }

    /// Publish `price` signed by `signers`, submitted by `voted`.
    pub fn publish(
        &mut self,
        pair: PairId,
        price: u128,
        voted: &Oracle,
        signers: &[&Oracle],
    ) -> Result<Vec<Event>, NetworkError> {
        let message = self.message(pair, price, voted)?;
        let votes = signed_votes(&message, signers);
        self.send(voted.reporter(), Transaction::Publish { message, votes })
    }
}
