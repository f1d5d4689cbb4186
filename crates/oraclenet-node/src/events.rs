//! Notification bus.
//!
//! Every event produced by an applied transaction, and every rejection, is
//! pushed to the printer as a [`Notification`]. The channel holds at most
//! `node.event_buffer` notifications; a full channel suspends the replay
//! until the printer catches up, so no notification is ever dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oraclenet_types::{BlockInfo, Event};
use serde::Serialize;
use tokio::sync::mpsc;

/// A notification pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Position in the notification stream, starting at 1.
    pub sequence: u64,
    /// Line of the transaction log that produced it.
    pub line: usize,
    /// Block of the transaction.
    pub block: BlockInfo,
    /// Event kind, or `tx_rejected`.
    pub event_type: String,
    /// Type-specific payload.
    pub payload: Payload,
}

/// Notification payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Event(Event),
    Rejected {
        tx: &'static str,
        category: &'static str,
        error: String,
    },
}

/// Filter for subscriptions.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Category filter: "oracle", "staking", "subscription", "round",
    /// "price", "settlement", "governance", "system".
    pub categories: Option<Vec<String>>,
}

/// Bus delivering notifications to a single consumer.
#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::Sender<Notification>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity and its receiving end.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let bus = Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        };
        (bus, receiver)
    }

    /// Emit a notification for `payload` and return its sequence number.
    ///
    /// Waits while the buffer is full.
    pub async fn emit(&self, line: usize, block: BlockInfo, payload: Payload) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event_type = match &payload {
            Payload::Event(event) => event.kind().to_string(),
            Payload::Rejected { .. } => "tx_rejected".to_string(),
        };
        let notification = Notification {
            sequence,
            line,
            block,
            event_type,
            payload,
        };
        if self.sender.send(notification).await.is_err() {
            // Receiver gone; nothing left to print.
            tracing::debug!(sequence, "notification dropped, receiver closed");
        }
        sequence
    }

    /// Number of notifications emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Build a filter from configured categories. An empty list matches all.
    pub fn from_categories(categories: &[String]) -> Self {
        Self {
            categories: (!categories.is_empty()).then(|| categories.to_vec()),
        }
    }

    /// Check if a notification matches this filter.
    pub fn matches(&self, notification: &Notification) -> bool {
        match &self.categories {
            Some(categories) => {
                let category = categorize_event(&notification.event_type);
                categories.iter().any(|c| c == category)
            }
            None => true,
        }
    }
}

/// Categorize an event kind.
fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        s if s.starts_with("oracle_") => "oracle",
        s if s.starts_with("stake_") => "staking",
        "subscribed" | "unsubscribed" | "displaced" | "removed_for_low_stake" => "subscription",
        "admitted_to_round" | "removed_from_round" | "points_forfeited" | "reward_paid"
        | "round_switched" => "round",
        "price_published" | "emergency_published" => "price",
        s if s.starts_with("payment_") => "settlement",
        "pair_registered" | "parameter_changed" => "governance",
        _ => "system",
    }
}
