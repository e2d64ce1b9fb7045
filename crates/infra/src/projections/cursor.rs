use std::collections::HashMap;
use std::sync::RwLock;

use invenhub_core::AggregateId;
use invenhub_events::EventEnvelope;

use super::ProjectionError;

/// Per-stream checkpoints (last applied sequence number).
///
/// Keyed by `(aggregate_type, aggregate_id)`: a product and its stock ledger
/// share one aggregate id but are distinct streams.
#[derive(Debug, Default)]
pub struct Cursors {
    inner: RwLock<HashMap<(String, AggregateId), u64>>,
}

impl Cursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the envelope should be applied.
    ///
    /// `Ok(false)` for redeliveries at or below the cursor; an error when
    /// the envelope skips ahead of the next expected sequence number.
    pub fn admit<E>(&self, envelope: &EventEnvelope<E>) -> Result<bool, ProjectionError> {
        let last = self.last(envelope.aggregate_type(), envelope.aggregate_id());
        let found = envelope.sequence_number();
        if found <= last {
            return Ok(false);
        }
        if found != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found });
        }
        Ok(true)
    }

    pub fn advance<E>(&self, envelope: &EventEnvelope<E>) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(
                (envelope.aggregate_type().to_string(), envelope.aggregate_id()),
                envelope.sequence_number(),
            );
        }
    }

    pub fn last(&self, aggregate_type: &str, aggregate_id: AggregateId) -> u64 {
        match self.inner.read() {
            Ok(map) => map
                .get(&(aggregate_type.to_string(), aggregate_id))
                .copied()
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn env(aggregate_type: &str, id: AggregateId, seq: u64) -> EventEnvelope<()> {
        EventEnvelope::new(Uuid::now_v7(), id, aggregate_type, "t", seq, Utc::now(), ())
    }

    #[test]
    fn duplicates_are_skipped_and_gaps_rejected() {
        let cursors = Cursors::new();
        let id = AggregateId::new();

        assert!(cursors.admit(&env("a", id, 1)).unwrap());
        cursors.advance(&env("a", id, 1));

        assert!(!cursors.admit(&env("a", id, 1)).unwrap());
        assert!(matches!(
            cursors.admit(&env("a", id, 3)),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 3 })
        ));
    }

    #[test]
    fn streams_sharing_an_id_are_tracked_separately() {
        let cursors = Cursors::new();
        let id = AggregateId::new();
        cursors.advance(&env("products.product", id, 4));

        assert!(cursors.admit(&env("inventory.stock", id, 1)).unwrap());
        assert_eq!(cursors.last("products.product", id), 4);
    }
}
