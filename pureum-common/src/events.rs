//! Event types for the companion client core
//!
//! Provides the shared event definitions and the EventBus the embedding UI
//! shell subscribes to. Events are the reactive half of the drafting
//! pipeline: rendering observes the bus, but nothing read from the bus ever
//! feeds a save (see the attendance mirror).

use crate::api::{AttendanceStatus, DraftId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which asset list an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Photo,
    Receipt,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Photo => "photo",
            AssetKind::Receipt => "receipt",
        }
    }
}

/// Companion event types
///
/// Broadcast via EventBus; serializable so an embedding shell can forward
/// them over its own transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CompanionEvent {
    /// An attendance row was toggled or the roster was (re)seeded
    AttendanceChanged {
        /// Member whose row changed; None when the whole roster was replaced
        user_id: Option<i64>,
        /// New status for that member (None on roster replacement)
        status: Option<AttendanceStatus>,
        /// When the change happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A kept or pending asset list changed (add, remove, hydrate)
    AssetsChanged {
        /// Which asset list changed
        kind: AssetKind,
        /// Count of kept-existing entries after the change
        kept: usize,
        /// Count of pending-new entries after the change
        pending: usize,
        /// When the change happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One receipt-recognition attempt settled (applied, superseded or failed)
    RecognitionSettled {
        /// Generation ticket of the attempt
        ticket: u64,
        /// Provider that produced the result, when one succeeded
        provider: Option<String>,
        /// Number of recognized line items (0 on failure or supersession)
        item_count: usize,
        /// Whether the result was applied to the draft
        applied: bool,
        /// When the attempt settled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A save completed and the server acknowledged the patch
    DraftSaved {
        /// Draft id returned by the report service
        draft_id: DraftId,
        /// When the save completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The draft was submitted; it is immutable from now on
    DraftSubmitted {
        /// Draft id that was submitted
        draft_id: DraftId,
        /// When the submission completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus carrying [`CompanionEvent`]s to any number of subscribers.
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CompanionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CompanionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscriber is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CompanionEvent,
    ) -> Result<usize, broadcast::error::SendError<CompanionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// Used for UI-refresh notifications where a missing subscriber is fine.
    pub fn emit_lossy(&self, event: CompanionEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(CompanionEvent::DraftSaved {
            draft_id: 42,
            timestamp: chrono::Utc::now(),
        })
        .expect("one subscriber");

        match rx.recv().await.expect("receive") {
            CompanionEvent::DraftSaved { draft_id, .. } => assert_eq!(draft_id, 42),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn emit_without_subscribers_errors_but_lossy_does_not() {
        let bus = EventBus::new(4);
        let event = CompanionEvent::AssetsChanged {
            kind: AssetKind::Photo,
            kept: 1,
            pending: 0,
            timestamp: chrono::Utc::now(),
        };
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event); // must not panic
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn emit_lossy_survives_full_channel() {
        let bus = EventBus::new(1);
        let _rx = bus.subscribe();
        for _ in 0..10 {
            bus.emit_lossy(CompanionEvent::AttendanceChanged {
                user_id: Some(1),
                status: Some(AttendanceStatus::Absent),
                timestamp: chrono::Utc::now(),
            });
        }
    }
}
