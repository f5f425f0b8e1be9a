//! Change-feed events emitted by the backend
//!
//! Every insert/update/delete on a backend table is published on an
//! [`EventBus`] built on `tokio::sync::broadcast`. The mirror subscribes once
//! per table and treats any event as "this table changed": the payload is
//! informational only, a full re-fetch follows.
//!
//! # Architecture
//!
//! ```text
//! backend write ──▶ EventBus::publish() ──▶ broadcast channel ──▶ leads listener
//!                                                             ──▶ follow_ups listener
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = EventBus::new(1024);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(ChangeEvent::new(Table::Leads, ChangeAction::Insert, "lead-1"));
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("{} changed", envelope.event.table);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Backend tables mirrored on the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Leads,
    FollowUps,
}

impl Table {
    /// Backend table name
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Leads => "leads",
            Table::FollowUps => "follow_ups",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of row mutation reported by the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Insert => "insert",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

/// A single row mutation on a backend table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Table the row belongs to
    pub table: Table,
    /// What happened to the row
    pub action: ChangeAction,
    /// Backend id of the affected row
    pub record_id: String,
}

impl ChangeEvent {
    pub fn new(table: Table, action: ChangeAction, record_id: impl Into<String>) -> Self {
        Self {
            table,
            action,
            record_id: record_id.into(),
        }
    }
}

/// Envelope wrapping a change event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event was published
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: ChangeEvent,
}

impl EventEnvelope {
    pub fn new(event: ChangeEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based change feed for one backend table
///
/// The bus is cheap to clone and can be shared across tasks. Slow receivers
/// that fall more than `capacity` events behind get a `Lagged` error on
/// their next `recv()`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will see the event
    /// (zero when nobody is listening).
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        // send() returns Err only if there are no receivers
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Current number of active subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_serialization() {
        let event = ChangeEvent::new(Table::FollowUps, ChangeAction::Delete, "fu-9");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["table"], "follow_ups");
        assert_eq!(json["action"], "delete");
        assert_eq!(json["record_id"], "fu-9");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Table::Leads.to_string(), "leads");
        assert_eq!(Table::FollowUps.as_str(), "follow_ups");
    }

    #[test]
    fn test_event_envelope_has_metadata() {
        let envelope =
            EventEnvelope::new(ChangeEvent::new(Table::Leads, ChangeAction::Insert, "l-1"));
        assert!(!envelope.id.is_nil());
        assert!(envelope.timestamp <= Utc::now());
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let receivers = bus.publish(ChangeEvent::new(Table::Leads, ChangeAction::Update, "l-1"));
        assert_eq!(receivers, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event.record_id, "l-1");
        assert_eq!(received.event.action, ChangeAction::Update);
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        bus.publish(ChangeEvent::new(Table::Leads, ChangeAction::Delete, "l-2"));

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
    }

    #[test]
    fn test_event_bus_publish_without_subscribers() {
        let bus = EventBus::default();
        let receivers = bus.publish(ChangeEvent::new(Table::Leads, ChangeAction::Insert, "x"));
        assert_eq!(receivers, 0);
    }
}
