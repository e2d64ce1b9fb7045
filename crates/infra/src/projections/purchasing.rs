use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use invenhub_events::EventEnvelope;
use invenhub_products::ProductId;
use invenhub_purchasing::{
    LineItem, OrderOrigin, PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus, total_cost,
};
use invenhub_suppliers::SupplierId;

use super::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::read_model::ReadStore;
use crate::streams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOrderReadModel {
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: SupplierId,
    pub lines: Vec<LineItem>,
    pub total_cost: u64,
    pub origin: OrderOrigin,
    pub notes: Option<String>,
    pub expected_at: Option<DateTime<Utc>>,
    pub status: PurchaseOrderStatus,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ordered_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase orders. Deleted orders are dropped from the read model.
#[derive(Debug)]
pub struct PurchaseOrdersProjection<S> {
    store: S,
    cursors: Cursors,
}

impl<S> PurchaseOrdersProjection<S>
where
    S: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::new(),
        }
    }

    pub fn get(&self, order_id: &PurchaseOrderId) -> Option<PurchaseOrderReadModel> {
        self.store.get(order_id)
    }

    /// Orders newest first, optionally filtered by status.
    pub fn list(&self, status: Option<PurchaseOrderStatus>) -> Vec<PurchaseOrderReadModel> {
        let mut orders: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Products appearing on a pending or ordered purchase order.
    pub fn products_on_open_orders(&self) -> HashSet<ProductId> {
        self.store
            .list()
            .into_iter()
            .filter(|o| o.status.is_open())
            .flat_map(|o| o.lines.into_iter().map(|l| l.product_id))
            .collect()
    }

    fn update(
        &self,
        order_id: PurchaseOrderId,
        at: DateTime<Utc>,
        f: impl FnOnce(&mut PurchaseOrderReadModel),
    ) {
        if let Some(mut rm) = self.store.get(&order_id) {
            f(&mut rm);
            rm.updated_at = at;
            self.store.upsert(order_id, rm);
        }
    }
}

impl<S> Projection for PurchaseOrdersProjection<S>
where
    S: ReadStore<PurchaseOrderId, PurchaseOrderReadModel>,
{
    fn name(&self) -> &'static str {
        "purchasing.orders"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::PURCHASE_ORDER || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let ev: PurchaseOrderEvent = decode(envelope)?;
        let order_id = match &ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.order_id,
            PurchaseOrderEvent::PurchaseOrderPlaced(e) => e.order_id,
            PurchaseOrderEvent::GoodsReceived(e) => e.order_id,
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => e.order_id,
            PurchaseOrderEvent::PurchaseOrderDeleted(e) => e.order_id,
        };
        ensure_stream(envelope, order_id.0)?;

        match ev {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.store.upsert(
                    e.order_id,
                    PurchaseOrderReadModel {
                        order_id: e.order_id,
                        po_number: e.po_number,
                        supplier_id: e.supplier_id,
                        total_cost: total_cost(&e.lines),
                        lines: e.lines,
                        origin: e.origin,
                        notes: e.notes,
                        expected_at: e.expected_at,
                        status: PurchaseOrderStatus::Pending,
                        cancel_reason: None,
                        created_at: e.occurred_at,
                        ordered_at: None,
                        received_at: None,
                        updated_at: e.occurred_at,
                    },
                );
            }
            PurchaseOrderEvent::PurchaseOrderPlaced(e) => self.update(e.order_id, e.occurred_at, |o| {
                o.status = PurchaseOrderStatus::Ordered;
                o.ordered_at = Some(e.occurred_at);
            }),
            PurchaseOrderEvent::GoodsReceived(e) => self.update(e.order_id, e.occurred_at, |o| {
                o.status = PurchaseOrderStatus::Received;
                o.received_at = Some(e.occurred_at);
            }),
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => self.update(e.order_id, e.occurred_at, |o| {
                o.status = PurchaseOrderStatus::Cancelled;
                o.cancel_reason = e.reason;
            }),
            PurchaseOrderEvent::PurchaseOrderDeleted(e) => {
                self.store.remove(&e.order_id);
            }
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn reset(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
