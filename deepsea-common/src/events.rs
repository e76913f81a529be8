//! Event types for the Deepsea event system
//!
//! Provides the shared event enum and the EventBus broadcasting it.

use crate::api::{RenderPhase, SpeciesView};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Deepsea event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DeepseaEvent {
    /// A species view was rendered on a display
    ///
    /// Emitted once per render: a view request produces a `cached` render
    /// (when a cache entry exists) followed by a `fresh` render, unless the
    /// display moved on to another record first.
    SpeciesViewRendered {
        /// Display the view belongs to
        display: String,
        /// View request identifier
        view_id: Uuid,
        record_id: String,
        phase: RenderPhase,
        view: Box<SpeciesView>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A view was requested for a record missing from the dataset
    SpeciesViewUnavailable {
        display: String,
        record_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DeepseaEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DeepseaEvent::SpeciesViewRendered { .. } => "SpeciesViewRendered",
            DeepseaEvent::SpeciesViewUnavailable { .. } => "SpeciesViewUnavailable",
        }
    }
}

/// Broadcast bus for DeepseaEvent
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DeepseaEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped for slow receivers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DeepseaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DeepseaEvent,
    ) -> Result<usize, broadcast::error::SendError<DeepseaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DeepseaEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
