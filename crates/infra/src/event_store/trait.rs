use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use invenhub_core::{AggregateId, ExpectedVersion};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`], which
/// serializes the payload and captures `event_type`, schema version and
/// business time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are per stream, start at 1 and have no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into an envelope for publication.
    pub fn to_envelope(&self) -> invenhub_events::EventEnvelope<JsonValue> {
        invenhub_events::EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.event_type.clone(),
            self.sequence_number,
            self.occurred_at,
            self.payload.clone(),
        )
    }
}

/// Event store operation error.
///
/// Infrastructure failures (storage, concurrency) as opposed to domain errors.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("event log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event log is corrupt: {0}")]
    Corrupt(String),

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Stream identity: aggregate type plus aggregate id.
///
/// A product and its stock ledger share an id but are separate streams.
pub type StreamKey = (String, AggregateId);

/// Append-only event store.
///
/// Events are organized into streams, one per aggregate instance and type. `append`
/// checks the batch targets a single stream, enforces `expected_version`
/// against the current stream version, assigns sequence numbers
/// `current + 1..` and persists the batch atomically.
pub trait EventStore: Send + Sync {
    /// Append events to an aggregate stream (append-only).
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load the full stream for an aggregate (empty if it never existed).
    fn load_stream(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Every stored event in commit order (projection rebuilds).
    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(aggregate_type, aggregate_id)
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all()
    }
}

impl UncommittedEvent {
    /// Build an uncommitted event from a typed domain event.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: invenhub_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// Validate a batch against the current stream and assign sequence numbers.
///
/// Shared by every backend so they agree on append semantics.
pub(crate) fn prepare_append(
    stream: &[StoredEvent],
    events: Vec<UncommittedEvent>,
    expected_version: ExpectedVersion,
) -> Result<Vec<StoredEvent>, EventStoreError> {
    let Some(first) = events.first() else {
        return Ok(vec![]);
    };
    let aggregate_id = first.aggregate_id;
    let aggregate_type = first.aggregate_type.clone();

    for (idx, e) in events.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "batch contains multiple aggregate_ids (index {idx})"
            )));
        }
        if e.aggregate_type != aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "batch contains multiple aggregate_types (index {idx})"
            )));
        }
    }

    let current = stream.last().map(|e| e.sequence_number).unwrap_or(0);
    if !expected_version.matches(current) {
        return Err(EventStoreError::Concurrency(format!(
            "expected {expected_version:?}, found {current}"
        )));
    }

    if let Some(existing) = stream.first() {
        if existing.aggregate_type != aggregate_type || existing.aggregate_id != aggregate_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "batch for {aggregate_type}/{aggregate_id} does not belong to stream {}/{}",
                existing.aggregate_type, existing.aggregate_id
            )));
        }
    }

    Ok(events
        .into_iter()
        .zip(current + 1..)
        .map(|(e, sequence_number)| StoredEvent {
            event_id: e.event_id,
            aggregate_id: e.aggregate_id,
            aggregate_type: e.aggregate_type,
            sequence_number,
            event_type: e.event_type,
            event_version: e.event_version,
            occurred_at: e.occurred_at,
            payload: e.payload,
        })
        .collect())
}

/// Key of the stream a batch targets, if the batch is non-empty.
pub(crate) fn batch_key(events: &[UncommittedEvent]) -> Option<StreamKey> {
    events.first().map(|e| (e.aggregate_type.clone(), e.aggregate_id))
}
