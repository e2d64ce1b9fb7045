//! Projection implementations (read model builders).
//!
//! Projections consume committed envelopes and build query-optimized read
//! models. All of them are:
//! - **Rebuildable**: reset, then replay `EventStore::load_all()`
//! - **Idempotent**: redelivered envelopes at or below the cursor are skipped
//! - **Gap-intolerant**: an envelope skipping ahead of its stream is rejected

pub mod bus;
pub mod cursor;
pub mod products;
pub mod purchasing;
pub mod read_models;
pub mod sales;
pub mod stock_levels;
pub mod suppliers;
pub mod users;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use invenhub_events::EventEnvelope;

pub use bus::{ProjectionBus, ProjectionBusError};
pub use cursor::Cursors;
pub use products::{ProductCatalogProjection, ProductReadModel};
pub use purchasing::{PurchaseOrderReadModel, PurchaseOrdersProjection};
pub use read_models::ReadModels;
pub use sales::{SaleReadModel, SalesProjection};
pub use stock_levels::{StockLevel, StockLevelsProjection};
pub use suppliers::{SupplierReadModel, SuppliersProjection};
pub use users::{UserReadModel, UsersProjection};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("event does not belong to its stream: {0}")]
    StreamMismatch(String),

    #[error("read model lock poisoned")]
    Poisoned,
}

/// A read model builder fed by the projection bus.
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply one committed envelope. Envelopes of other aggregate types are ignored.
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Drop all state and cursors ahead of a rebuild.
    fn reset(&self);
}

pub(crate) fn decode<E: DeserializeOwned>(envelope: &EventEnvelope<JsonValue>) -> Result<E, ProjectionError> {
    serde_json::from_value(envelope.payload().clone()).map_err(|e| ProjectionError::Deserialize(e.to_string()))
}

pub(crate) fn ensure_stream(
    envelope: &EventEnvelope<JsonValue>,
    event_aggregate_id: invenhub_core::AggregateId,
) -> Result<(), ProjectionError> {
    if event_aggregate_id != envelope.aggregate_id() {
        return Err(ProjectionError::StreamMismatch(format!(
            "payload id {event_aggregate_id} does not match envelope aggregate_id {}",
            envelope.aggregate_id()
        )));
    }
    Ok(())
}
