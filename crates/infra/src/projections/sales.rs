use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use invenhub_auth::UserId;
use invenhub_events::EventEnvelope;
use invenhub_sales::{PaymentMethod, SaleEvent, SaleId, SaleLine, SaleStatus};

use super::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::read_model::ReadStore;
use crate::streams;

/// Receipt as shown in the sales history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReadModel {
    pub sale_id: SaleId,
    pub receipt_no: String,
    pub lines: Vec<SaleLine>,
    pub subtotal: u64,
    pub discount: u64,
    pub total: u64,
    pub cost_total: u64,
    pub payment_method: PaymentMethod,
    pub cashier_id: UserId,
    pub customer_name: Option<String>,
    pub status: SaleStatus,
    pub sold_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl SaleReadModel {
    pub fn units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[derive(Debug)]
pub struct SalesProjection<S> {
    store: S,
    cursors: Cursors,
}

impl<S> SalesProjection<S>
where
    S: ReadStore<SaleId, SaleReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::new(),
        }
    }

    pub fn get(&self, sale_id: &SaleId) -> Option<SaleReadModel> {
        self.store.get(sale_id)
    }

    /// Sales newest first, optionally bounded by `sold_at` (inclusive).
    pub fn list_between(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Vec<SaleReadModel> {
        let mut sales: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|s| from.is_none_or(|f| s.sold_at >= f) && to.is_none_or(|t| s.sold_at <= t))
            .collect();
        sales.sort_by(|a, b| b.sold_at.cmp(&a.sold_at));
        sales
    }
}

impl<S> Projection for SalesProjection<S>
where
    S: ReadStore<SaleId, SaleReadModel>,
{
    fn name(&self) -> &'static str {
        "sales.history"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::SALE || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let ev: SaleEvent = decode(envelope)?;
        let sale_id = match &ev {
            SaleEvent::Recorded(e) => e.sale_id,
            SaleEvent::Voided(e) => e.sale_id,
        };
        ensure_stream(envelope, sale_id.0)?;

        match ev {
            SaleEvent::Recorded(e) => {
                let subtotal = e.subtotal();
                let total = e.total();
                let cost_total = e.lines.iter().map(SaleLine::cost_amount).sum();
                self.store.upsert(
                    e.sale_id,
                    SaleReadModel {
                        sale_id: e.sale_id,
                        receipt_no: e.receipt_no,
                        lines: e.lines,
                        subtotal,
                        discount: e.discount,
                        total,
                        cost_total,
                        payment_method: e.payment_method,
                        cashier_id: e.cashier_id,
                        customer_name: e.customer_name,
                        status: SaleStatus::Completed,
                        sold_at: e.occurred_at,
                        voided_at: None,
                        void_reason: None,
                    },
                );
            }
            SaleEvent::Voided(e) => {
                if let Some(mut rm) = self.store.get(&e.sale_id) {
                    rm.status = SaleStatus::Voided;
                    rm.voided_at = Some(e.occurred_at);
                    rm.void_reason = Some(e.reason);
                    self.store.upsert(e.sale_id, rm);
                }
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
