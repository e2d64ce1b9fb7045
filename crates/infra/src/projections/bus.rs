//! Synchronous projection fan-in plus subscriber fan-out.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use invenhub_events::{EventBus, EventEnvelope, InMemoryBusError, InMemoryEventBus, Subscription};

use super::{Projection, ProjectionError};
use crate::event_store::{EventStore, EventStoreError};

#[derive(Debug, Error)]
pub enum ProjectionBusError {
    #[error("projection {name} failed: {source}")]
    Projection {
        name: &'static str,
        #[source]
        source: ProjectionError,
    },

    #[error("subscriber fan-out failed: {0:?}")]
    Fanout(InMemoryBusError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// Event bus that keeps read models current before anyone else hears of an event.
///
/// `publish` applies the envelope to every registered projection in order,
/// then forwards it to subscribers. A failing projection does not stop the
/// others; the first failure is returned after fan-out.
pub struct ProjectionBus {
    projections: Vec<Arc<dyn Projection>>,
    fanout: InMemoryEventBus<EventEnvelope<JsonValue>>,
}

impl ProjectionBus {
    pub fn new(projections: Vec<Arc<dyn Projection>>) -> Self {
        Self {
            projections,
            fanout: InMemoryEventBus::new(),
        }
    }

    /// Reset every projection and replay the whole log in commit order.
    ///
    /// Returns the number of events replayed.
    pub fn rebuild<S: EventStore + ?Sized>(&self, store: &S) -> Result<usize, ProjectionBusError> {
        for p in &self.projections {
            p.reset();
        }

        let events = store.load_all()?;
        for stored in &events {
            let envelope = stored.to_envelope();
            self.apply(&envelope)?;
        }

        tracing::info!(events = events.len(), projections = self.projections.len(), "read models rebuilt");
        Ok(events.len())
    }

    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionBusError> {
        let mut first_error = None;
        for p in &self.projections {
            if let Err(source) = p.apply_envelope(envelope) {
                tracing::warn!(
                    projection = p.name(),
                    event_type = envelope.event_type(),
                    aggregate_id = %envelope.aggregate_id(),
                    sequence = envelope.sequence_number(),
                    error = %source,
                    "projection failed to apply event"
                );
                if first_error.is_none() {
                    first_error = Some(ProjectionBusError::Projection { name: p.name(), source });
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl EventBus<EventEnvelope<JsonValue>> for ProjectionBus {
    type Error = ProjectionBusError;

    fn publish(&self, message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        let applied = self.apply(&message);
        self.fanout.publish(message).map_err(ProjectionBusError::Fanout)?;
        applied
    }

    fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.fanout.subscribe()
    }
}
