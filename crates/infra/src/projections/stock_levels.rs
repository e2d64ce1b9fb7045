use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use invenhub_events::EventEnvelope;
use invenhub_inventory::StockEvent;
use invenhub_products::ProductId;

use super::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::read_model::ReadStore;
use crate::streams;

/// Current on-hand quantity of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub on_hand: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct StockLevelsProjection<S> {
    store: S,
    cursors: Cursors,
}

impl<S> StockLevelsProjection<S>
where
    S: ReadStore<ProductId, StockLevel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::new(),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<StockLevel> {
        self.store.get(product_id)
    }

    /// On-hand quantity, zero for products whose stock was never opened.
    pub fn on_hand(&self, product_id: &ProductId) -> i64 {
        self.store.get(product_id).map(|s| s.on_hand).unwrap_or(0)
    }

    pub fn list(&self) -> Vec<StockLevel> {
        self.store.list()
    }
}

impl<S> Projection for StockLevelsProjection<S>
where
    S: ReadStore<ProductId, StockLevel>,
{
    fn name(&self) -> &'static str {
        "inventory.stock_levels"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::STOCK || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let ev: StockEvent = decode(envelope)?;
        let product_id = ev.product_id();
        ensure_stream(envelope, product_id.0)?;

        self.store.upsert(
            product_id,
            StockLevel {
                product_id,
                on_hand: ev.on_hand(),
                updated_at: envelope.occurred_at(),
            },
        );

        self.cursors.advance(envelope);
        Ok(())
    }

    fn reset(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
