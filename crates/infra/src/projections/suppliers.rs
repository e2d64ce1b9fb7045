use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use invenhub_events::EventEnvelope;
use invenhub_suppliers::{ContactInfo, SupplierEvent, SupplierId, SupplierStatus};

use super::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::read_model::ReadStore;
use crate::streams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierReadModel {
    pub supplier_id: SupplierId,
    pub name: String,
    pub contact: ContactInfo,
    pub contact_person: Option<String>,
    pub lead_time_days: u32,
    pub status: SupplierStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplierReadModel {
    pub fn is_active(&self) -> bool {
        self.status == SupplierStatus::Active
    }
}

/// Supplier directory. Removed suppliers are kept (products and orders may
/// still point at them) but hidden from listings.
#[derive(Debug)]
pub struct SuppliersProjection<S> {
    store: S,
    cursors: Cursors,
}

impl<S> SuppliersProjection<S>
where
    S: ReadStore<SupplierId, SupplierReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::new(),
        }
    }

    /// Lookup that hides removed suppliers.
    pub fn get(&self, supplier_id: &SupplierId) -> Option<SupplierReadModel> {
        self.store
            .get(supplier_id)
            .filter(|s| s.status != SupplierStatus::Removed)
    }

    /// Lookup including removed suppliers (historical references).
    pub fn get_any(&self, supplier_id: &SupplierId) -> Option<SupplierReadModel> {
        self.store.get(supplier_id)
    }

    pub fn list(&self) -> Vec<SupplierReadModel> {
        let mut all: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|s| s.status != SupplierStatus::Removed)
            .collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        all
    }

    fn set_status(&self, supplier_id: SupplierId, status: SupplierStatus, at: DateTime<Utc>) {
        if let Some(mut rm) = self.store.get(&supplier_id) {
            rm.status = status;
            rm.updated_at = at;
            self.store.upsert(supplier_id, rm);
        }
    }
}

impl<S> Projection for SuppliersProjection<S>
where
    S: ReadStore<SupplierId, SupplierReadModel>,
{
    fn name(&self) -> &'static str {
        "suppliers.directory"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::SUPPLIER || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let ev: SupplierEvent = decode(envelope)?;
        let supplier_id = match &ev {
            SupplierEvent::Registered(e) => e.supplier_id,
            SupplierEvent::Updated(e) => e.supplier_id,
            SupplierEvent::Deactivated(e) | SupplierEvent::Reactivated(e) | SupplierEvent::Removed(e) => {
                e.supplier_id
            }
        };
        ensure_stream(envelope, supplier_id.0)?;

        match ev {
            SupplierEvent::Registered(e) => {
                self.store.upsert(
                    e.supplier_id,
                    SupplierReadModel {
                        supplier_id: e.supplier_id,
                        name: e.name,
                        contact: e.contact,
                        contact_person: e.contact_person,
                        lead_time_days: e.lead_time_days,
                        status: SupplierStatus::Active,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            SupplierEvent::Updated(e) => {
                if let Some(mut rm) = self.store.get(&e.supplier_id) {
                    rm.name = e.name;
                    rm.contact = e.contact;
                    rm.contact_person = e.contact_person;
                    rm.lead_time_days = e.lead_time_days;
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.supplier_id, rm);
                }
            }
            SupplierEvent::Deactivated(e) => self.set_status(e.supplier_id, SupplierStatus::Inactive, e.occurred_at),
            SupplierEvent::Reactivated(e) => self.set_status(e.supplier_id, SupplierStatus::Active, e.occurred_at),
            SupplierEvent::Removed(e) => self.set_status(e.supplier_id, SupplierStatus::Removed, e.occurred_at),
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn reset(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
