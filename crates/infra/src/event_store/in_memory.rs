use std::collections::HashMap;
use std::sync::RwLock;

use invenhub_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamKey, UncommittedEvent, batch_key, prepare_append};

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<StreamKey, Vec<StoredEvent>>,
    /// Global commit order.
    log: Vec<StoredEvent>,
}

/// In-memory append-only event store.
///
/// Used when no data directory is configured, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(key) = batch_key(&events) else {
            return Ok(vec![]);
        };

        let mut inner = self.inner.write().map_err(|_| EventStoreError::Poisoned)?;
        let stream = inner.streams.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let committed = prepare_append(stream, events, expected_version)?;

        inner
            .streams
            .entry(key)
            .or_default()
            .extend(committed.iter().cloned());
        inner.log.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner
            .streams
            .get(&(aggregate_type.to_string(), aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(inner.log.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn event(aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "n": 1 }),
        }
    }

    #[test]
    fn assigns_sequence_numbers_from_one() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let committed = store
            .append(vec![event(id, "t"), event(id, "t")], ExpectedVersion::Exact(0))
            .unwrap();
        assert_eq!(
            committed.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let more = store.append(vec![event(id, "t")], ExpectedVersion::Exact(2)).unwrap();
        assert_eq!(more[0].sequence_number, 3);
        assert_eq!(store.load_stream("t", id).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(vec![event(id, "t")], ExpectedVersion::Exact(0)).unwrap();

        let err = store.append(vec![event(id, "t")], ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[test]
    fn same_id_with_another_type_is_a_separate_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(vec![event(id, "a"), event(id, "a")], ExpectedVersion::Exact(0)).unwrap();

        let other = store.append(vec![event(id, "b")], ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(other[0].sequence_number, 1);
        assert_eq!(store.load_stream("a", id).unwrap().len(), 2);
        assert_eq!(store.load_stream("b", id).unwrap().len(), 1);
    }

    #[test]
    fn mixed_types_in_one_batch_are_rejected() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let err = store
            .append(vec![event(id, "a"), event(id, "b")], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn load_all_keeps_commit_order_across_streams() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        store.append(vec![event(a, "t")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(b, "t")], ExpectedVersion::Any).unwrap();
        store.append(vec![event(a, "t")], ExpectedVersion::Any).unwrap();

        let order: Vec<_> = store
            .load_all()
            .unwrap()
            .into_iter()
            .map(|e| (e.aggregate_id, e.sequence_number))
            .collect();
        assert_eq!(order, vec![(a, 1), (b, 1), (a, 2)]);
    }
}
