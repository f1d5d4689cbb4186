//! Genesis: the network state before the first logged transaction.

use anyhow::Context;
use oraclenet_governance::Governor;
use oraclenet_network::{AdminAction, Envelope, Network, Transaction};
use oraclenet_token::{MemoryToken, TokenLedger};
use oraclenet_types::{Event, PairId};

use crate::config::NodeConfig;

/// Build the genesis network described by `config`.
///
/// Balances are minted, pairs registered and whitelists filled. Pair
/// whitelists are populated through administrative transactions sent by
/// the first governor at the genesis block.
pub fn build(config: &NodeConfig) -> anyhow::Result<(Network, Vec<Event>)> {
    let mut token = MemoryToken::new();
    for balance in &config.genesis.balances {
        token
            .mint(balance.account, balance.amount)
            .with_context(|| format!("minting genesis balance of {}", balance.account))?;
    }

    let governor = Governor::new(config.genesis.governors.iter().copied());
    let registry = config.build_registry()?;
    let mut network = Network::new(token, governor, registry)?;
    let block = config.genesis.block();

    let mut events = Vec::new();
    let mut whitelist_txs = Vec::new();
    for pair_config in &config.pairs {
        let pair = PairId::from_symbol(&pair_config.symbol)
            .with_context(|| format!("pair symbol {:?}", pair_config.symbol))?;
        events.extend(
            network
                .register_pair(pair, pair_config.params.clone(), &block)
                .with_context(|| format!("registering pair {pair}"))?,
        );
        for account in &pair_config.price_readers {
            whitelist_txs.push(AdminAction::AddPriceReader {
                pair,
                account: *account,
            });
        }
        for account in &pair_config.emergency_publishers {
            whitelist_txs.push(AdminAction::AddEmergencyPublisher {
                pair,
                account: *account,
            });
        }
    }

    if !whitelist_txs.is_empty() {
        let admin = config
            .genesis
            .governors
            .first()
            .copied()
            .context("pair whitelists require at least one genesis governor")?;
        for action in whitelist_txs {
            let envelope = Envelope::new(admin, block, Transaction::Admin(action));
            events.extend(network.apply(&envelope)?);
        }
    }

    tracing::info!(
        pairs = config.pairs.len(),
        governors = config.genesis.governors.len(),
        balances = config.genesis.balances.len(),
        block = block.number,
        "genesis built"
    );
    Ok((network, events))
}
