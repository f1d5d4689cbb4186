//! oraclenet-node: replays a transaction log against a genesis state.
//!
//! Reads the node configuration, builds the genesis network, applies every
//! envelope of the log in order and prints each resulting notification as
//! one JSON line on stdout.

mod config;
mod events;
mod genesis;
mod replay;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::events::{EventBus, EventFilter, Payload};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "oraclenet-node")]
#[command(about = "Replay an oracle network transaction log")]
struct Args {
    /// Config file. Defaults to $ORACLENET_CONFIG, then ./oraclenet.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transaction log, one JSON envelope per line. Reads stdin if absent.
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Stop at the first rejected transaction.
    #[arg(long)]
    stop_on_error: bool,

    /// Print the final round and price of every pair.
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("oraclenet=info".parse()?),
        )
        .init();

    let args = Args::parse();
    info!("oraclenet node starting");

    let config = NodeConfig::load(args.config)?;
    let stop_on_error = args.stop_on_error || config.node.stop_on_error;
    let (bus, rx) = EventBus::new(config.node.event_buffer);
    let filter = EventFilter::from_categories(&config.node.event_categories);

    let printer = tokio::spawn(print_notifications(rx, filter));

    let (mut network, genesis_events) = genesis::build(&config)?;
    let genesis_block = config.genesis.block();
    for event in genesis_events {
        bus.emit(0, genesis_block, Payload::Event(event)).await;
    }

    let result = match args.log {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            replay::run(&mut network, &bus, BufReader::new(file), stop_on_error).await
        }
        None => {
            replay::run(
                &mut network,
                &bus,
                BufReader::new(tokio::io::stdin()),
                stop_on_error,
            )
            .await
        }
    };

    let notifications = bus.sequence();
    drop(bus);
    if let Err(e) = printer.await {
        warn!("printer task failed: {}", e);
    }

    let summary = result?;
    if args.summary {
        for pair in network.pairs() {
            let coordinator = network.coordinator(pair)?;
            let published = coordinator.published();
            info!(
                %pair,
                round = coordinator.round_number(),
                selected = coordinator.selected().len(),
                subscribed = coordinator.subscribed().len(),
                price = published.value,
                price_block = published.block,
                "pair state"
            );
        }
    }
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        notifications,
        "oraclenet node stopped"
    );
    Ok(())
}

/// Print matching notifications as JSON lines until every bus handle is
/// dropped.
async fn print_notifications(mut rx: mpsc::Receiver<events::Notification>, filter: EventFilter) {
    let stdout = std::io::stdout();
    while let Some(notification) = rx.recv().await {
        if !filter.matches(&notification) {
            continue;
        }
        match serde_json::to_string(&notification) {
            Ok(line) => {
                let mut out = stdout.lock();
                if writeln!(out, "{line}").is_err() {
                    return;
                }
            }
            Err(e) => warn!(sequence = notification.sequence, "unserializable notification: {}", e),
        }
    }
}
