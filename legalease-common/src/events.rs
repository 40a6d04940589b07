//! Event types for the LegalEase event system
//!
//! Provides the shared event definitions and the broadcast `EventBus` used by
//! the analysis pipeline to announce status transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{AnalysisStatus, RiskLevel};

/// LegalEase event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LegalEaseEvent {
    /// Document moved through the analysis lifecycle
    DocumentStatusChanged {
        document_id: Uuid,
        /// Owner; SSE streams only forward a user's own documents
        user_id: Uuid,
        old_status: Option<AnalysisStatus>,
        new_status: AnalysisStatus,
        /// Failure message when `new_status` is `error`
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Analysis stored for a document
    AnalysisCompleted {
        document_id: Uuid,
        user_id: Uuid,
        overall_risk_score: u8,
        risk_level: RiskLevel,
        clause_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Document and its analysis removed
    DocumentDeleted {
        document_id: Uuid,
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl LegalEaseEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            LegalEaseEvent::DocumentStatusChanged { .. } => "DocumentStatusChanged",
            LegalEaseEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            LegalEaseEvent::DocumentDeleted { .. } => "DocumentDeleted",
        }
    }

    /// Owner of the document the event concerns
    pub fn user_id(&self) -> Uuid {
        match self {
            LegalEaseEvent::DocumentStatusChanged { user_id, .. }
            | LegalEaseEvent::AnalysisCompleted { user_id, .. }
            | LegalEaseEvent::DocumentDeleted { user_id, .. } => *user_id,
        }
    }
}

/// Broadcast bus for `LegalEaseEvent`s
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LegalEaseEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LegalEaseEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Status events are advisory; the database is the source of truth and
    /// clients fall back to polling.
    pub fn emit_lossy(&self, event: LegalEaseEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event(user_id: Uuid) -> LegalEaseEvent {
        LegalEaseEvent::DocumentStatusChanged {
            document_id: Uuid::new_v4(),
            user_id,
            old_status: Some(AnalysisStatus::Pending),
            new_status: AnalysisStatus::Analyzing,
            message: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let user = Uuid::new_v4();

        bus.emit_lossy(status_event(user));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "DocumentStatusChanged");
        assert_eq!(event.user_id(), user);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(status_event(Uuid::new_v4()));
        assert_eq!(bus.capacity(), 4);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let value = serde_json::to_value(status_event(Uuid::new_v4())).unwrap();
        assert_eq!(value["type"], "DocumentStatusChanged");
        assert_eq!(value["new_status"], "analyzing");
    }
}
