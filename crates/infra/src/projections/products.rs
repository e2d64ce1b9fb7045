use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use invenhub_events::EventEnvelope;
use invenhub_products::{Category, ProductEvent, ProductId, ProductStatus, normalize_sku};
use invenhub_suppliers::SupplierId;

use super::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::read_model::ReadStore;
use crate::streams;

/// Queryable product read model (catalog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductReadModel {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub price: u64,
    pub cost: u64,
    pub supplier_id: Option<SupplierId>,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductReadModel {
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

#[derive(Debug)]
pub struct ProductCatalogProjection<S> {
    store: S,
    cursors: Cursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::new(),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<ProductReadModel> {
        self.store.get(product_id)
    }

    /// Every product, archived included, ordered by SKU.
    pub fn list(&self) -> Vec<ProductReadModel> {
        let mut all = self.store.list();
        all.sort_by(|a, b| a.sku.cmp(&b.sku));
        all
    }

    pub fn list_active(&self) -> Vec<ProductReadModel> {
        self.list().into_iter().filter(ProductReadModel::is_active).collect()
    }

    /// Non-archived product holding `sku`, compared in canonical form.
    pub fn find_active_by_sku(&self, sku: &str) -> Option<ProductReadModel> {
        let sku = normalize_sku(sku);
        self.store.list().into_iter().find(|p| p.is_active() && p.sku == sku)
    }
}

impl<S> Projection for ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    fn name(&self) -> &'static str {
        "products.catalog"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::PRODUCT || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let ev: ProductEvent = decode(envelope)?;
        let product_id = match &ev {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::ProductUpdated(e) => e.product_id,
            ProductEvent::ReorderPolicySet(e) => e.product_id,
            ProductEvent::ProductArchived(e) => e.product_id,
        };
        ensure_stream(envelope, product_id.0)?;

        match ev {
            ProductEvent::ProductCreated(e) => {
                self.store.upsert(
                    e.product_id,
                    ProductReadModel {
                        product_id: e.product_id,
                        sku: e.sku,
                        name: e.name,
                        description: e.description,
                        category: e.category,
                        price: e.price,
                        cost: e.cost,
                        supplier_id: e.supplier_id,
                        reorder_level: e.reorder_level,
                        reorder_quantity: e.reorder_quantity,
                        status: ProductStatus::Active,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ProductEvent::ProductUpdated(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    rm.name = e.name;
                    rm.description = e.description;
                    rm.category = e.category;
                    rm.price = e.price;
                    rm.cost = e.cost;
                    rm.supplier_id = e.supplier_id;
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.product_id, rm);
                }
            }
            ProductEvent::ReorderPolicySet(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    rm.reorder_level = e.reorder_level;
                    rm.reorder_quantity = e.reorder_quantity;
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.product_id, rm);
                }
            }
            ProductEvent::ProductArchived(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    rm.status = ProductStatus::Archived;
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.product_id, rm);
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
