//! Deterministic replay of a transaction log.
//!
//! The log is JSON lines, one [`Envelope`] per line. Blank lines and lines
//! starting with `#` are skipped. Replaying the same log from the same
//! genesis always yields the same notifications and final state.

use anyhow::Context;
use oraclenet_network::{Envelope, Network};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::events::{EventBus, Payload};

/// Outcome counters of one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
    pub events: usize,
}

/// Apply a single log line.
///
/// Returns `Ok(true)` if the transaction was applied, `Ok(false)` if it
/// was rejected.
///
/// # Errors
///
/// Fails if the line is not a valid envelope.
pub async fn apply_line(
    network: &mut Network,
    bus: &EventBus,
    line_no: usize,
    line: &str,
    summary: &mut ReplaySummary,
) -> anyhow::Result<bool> {
    let envelope: Envelope =
        serde_json::from_str(line).with_context(|| format!("line {line_no}: malformed envelope"))?;

    match network.apply(&envelope) {
        Ok(events) => {
            summary.applied += 1;
            summary.events += events.len();
            for event in events {
                bus.emit(line_no, envelope.block, Payload::Event(event)).await;
            }
            Ok(true)
        }
        Err(e) => {
            summary.rejected += 1;
            let category = e.category().as_str();
            tracing::warn!(
                line = line_no,
                sender = %envelope.sender,
                tx = envelope.tx.kind(),
                category,
                error = %e,
                "transaction rejected"
            );
            bus.emit(
                line_no,
                envelope.block,
                Payload::Rejected {
                    tx: envelope.tx.kind(),
                    category,
                    error: e.to_string(),
                },
            )
            .await;
            Ok(false)
        }
    }
}

/// Replay every envelope read from `reader`.
///
/// # Errors
///
/// Fails on I/O errors, malformed lines, or the first rejection when
/// `stop_on_error` is set.
pub async fn run<R: AsyncBufRead + Unpin>(
    network: &mut Network,
    bus: &EventBus,
    reader: R,
    stop_on_error: bool,
) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let applied = apply_line(network, bus, line_no, trimmed, &mut summary).await?;
        if !applied && stop_on_error {
            anyhow::bail!("line {line_no}: transaction rejected, stopping");
        }
    }

    tracing::info!(
        applied = summary.applied,
        rejected = summary.rejected,
        events = summary.events,
        last_block = network.last_block().map(|b| b.number),
        "replay finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oraclenet_governance::Governor;
    use oraclenet_network::Transaction;
    use oraclenet_token::{MemoryToken, TokenLedger};
    use oraclenet_types::{Address, BlockInfo};

    fn network() -> Network {
        let mut token = MemoryToken::new();
        token.mint(Address::new([1u8; 20]), 100).expect("mint");
        Network::new(token, Governor::default(), Default::default()).expect("network")
    }

    fn line(sender: u8, block: u64, tx: Transaction) -> String {
        let envelope = Envelope::new(Address::new([sender; 20]), BlockInfo::new(block, block * 10), tx);
        serde_json::to_string(&envelope).expect("json")
    }

    #[tokio::test]
    async fn test_replay_counts_and_notifies() {
        let log = [
            "# comment".to_string(),
            line(
                1,
                1,
                Transaction::Transfer {
                    to: Address::new([2u8; 20]),
                    amount: 40,
                },
            ),
            String::new(),
            line(
                2,
                2,
                Transaction::Transfer {
                    to: Address::new([3u8; 20]),
                    amount: 41,
                },
            ),
            line(
                2,
                3,
                Transaction::RegisterOracle {
                    reporter: Address::new([9u8; 20]),
                    label: "two".into(),
                },
            ),
        ]
        .join("\n");

        let mut net = network();
        let (bus, mut rx) = EventBus::new(16);
        let summary = run(&mut net, &bus, log.as_bytes(), false).await.expect("replay");

        assert_eq!(
            summary,
            ReplaySummary {
                applied: 2,
                rejected: 1,
                events: 1,
            }
        );
        assert_eq!(net.token_balance(&Address::new([2u8; 20])), 40);

        let rejected = rx.try_recv().expect("rejection");
        assert_eq!(rejected.event_type, "tx_rejected");
        assert_eq!(rejected.line, 4);
        let registered = rx.try_recv().expect("registration");
        assert_eq!(registered.event_type, "oracle_registered");
    }

    #[tokio::test]
    async fn test_stop_on_error() {
        let log = line(
            7,
            1,
            Transaction::Transfer {
                to: Address::new([2u8; 20]),
                amount: 1,
            },
        );
        let mut net = network();
        let (bus, _rx) = EventBus::new(4);
        assert!(run(&mut net, &bus, log.as_bytes(), true).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_line() {
        let mut net = network();
        let (bus, _rx) = EventBus::new(4);
        let err = run(&mut net, &bus, &b"{not json}\n"[..], false)
            .await
            .expect_err("malformed");
        assert!(err.to_string().contains("line 1"));
    }
}
