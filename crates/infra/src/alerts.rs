//! Low-stock and out-of-stock notifications.
//!
//! Fed by the projection bus like any read model. Each product has at most
//! one open alert: a later stock change upgrades, downgrades or resolves it
//! in place instead of raising a new one, so a product sitting below its
//! reorder level produces a single notification.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use invenhub_events::EventEnvelope;
use invenhub_inventory::StockEvent;
use invenhub_products::{ProductEvent, ProductId};

use crate::projections::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::streams;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("notification not found")]
    NotFound,

    #[error("alert store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    pub alert_id: Uuid,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub kind: AlertKind,
    pub on_hand: i64,
    pub reorder_level: i64,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StockAlert {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
struct Watched {
    sku: String,
    name: String,
    reorder_level: i64,
    archived: bool,
    on_hand: Option<i64>,
}

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<ProductId, Watched>,
    alerts: HashMap<Uuid, StockAlert>,
    open: HashMap<ProductId, Uuid>,
}

#[derive(Debug, Default)]
pub struct StockAlertsProjection {
    inner: RwLock<Inner>,
    cursors: Cursors,
}

fn desired_kind(on_hand: i64, reorder_level: i64) -> Option<AlertKind> {
    if on_hand <= 0 {
        Some(AlertKind::OutOfStock)
    } else if on_hand <= reorder_level {
        Some(AlertKind::LowStock)
    } else {
        None
    }
}

fn message(kind: AlertKind, w: &Watched, on_hand: i64) -> String {
    match kind {
        AlertKind::OutOfStock => format!("{} ({}) is out of stock", w.name, w.sku),
        AlertKind::LowStock => format!(
            "{} ({}) is low on stock: {} left, reorder level {}",
            w.name, w.sku, on_hand, w.reorder_level
        ),
    }
}

impl Inner {
    fn evaluate(&mut self, product_id: ProductId, at: DateTime<Utc>) {
        let Some(w) = self.products.get(&product_id) else {
            return;
        };
        let Some(on_hand) = w.on_hand else {
            return;
        };
        let wanted = if w.archived {
            None
        } else {
            desired_kind(on_hand, w.reorder_level)
        };

        let open = self.open.get(&product_id).copied();
        match (open, wanted) {
            (Some(alert_id), None) => {
                if let Some(alert) = self.alerts.get_mut(&alert_id) {
                    alert.on_hand = on_hand;
                    alert.updated_at = at;
                    alert.resolved_at = Some(at);
                }
                self.open.remove(&product_id);
            }
            (Some(alert_id), Some(kind)) => {
                if let Some(alert) = self.alerts.get_mut(&alert_id) {
                    if alert.kind != kind {
                        alert.kind = kind;
                        alert.read = false;
                    }
                    alert.on_hand = on_hand;
                    alert.reorder_level = w.reorder_level;
                    alert.sku = w.sku.clone();
                    alert.name = w.name.clone();
                    alert.message = message(kind, w, on_hand);
                    alert.updated_at = at;
                }
            }
            (None, Some(kind)) => {
                let alert = StockAlert {
                    alert_id: Uuid::now_v7(),
                    product_id,
                    sku: w.sku.clone(),
                    name: w.name.clone(),
                    kind,
                    on_hand,
                    reorder_level: w.reorder_level,
                    message: message(kind, w, on_hand),
                    read: false,
                    created_at: at,
                    updated_at: at,
                    resolved_at: None,
                };
                tracing::info!(%product_id, sku = %alert.sku, ?kind, on_hand, "stock alert raised");
                self.open.insert(product_id, alert.alert_id);
                self.alerts.insert(alert.alert_id, alert);
            }
            (None, None) => {}
        }
    }
}

impl StockAlertsProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts newest first; resolved ones only when asked for.
    pub fn list(&self, include_resolved: bool) -> Vec<StockAlert> {
        let Ok(inner) = self.inner.read() else {
            return vec![];
        };
        let mut alerts: Vec<_> = inner
            .alerts
            .values()
            .filter(|a| include_resolved || a.is_open())
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        alerts
    }

    pub fn unread_count(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.alerts.values().filter(|a| a.is_open() && !a.read).count())
            .unwrap_or(0)
    }

    pub fn open_for(&self, product_id: &ProductId) -> Option<StockAlert> {
        let inner = self.inner.read().ok()?;
        inner.open.get(product_id).and_then(|id| inner.alerts.get(id)).cloned()
    }

    pub fn mark_read(&self, alert_id: Uuid) -> Result<StockAlert, AlertError> {
        let mut inner = self.inner.write().map_err(|_| AlertError::Poisoned)?;
        let alert = inner.alerts.get_mut(&alert_id).ok_or(AlertError::NotFound)?;
        alert.read = true;
        Ok(alert.clone())
    }

    /// Mark every open alert read; returns how many changed.
    pub fn mark_all_read(&self) -> usize {
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        let mut changed = 0;
        for alert in inner.alerts.values_mut().filter(|a| a.is_open() && !a.read) {
            alert.read = true;
            changed += 1;
        }
        changed
    }

    fn apply_product(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let ev: ProductEvent = decode(envelope)?;
        let mut inner = self.inner.write().map_err(|_| ProjectionError::Poisoned)?;

        let product_id = match &ev {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::ProductUpdated(e) => e.product_id,
            ProductEvent::ReorderPolicySet(e) => e.product_id,
            ProductEvent::ProductArchived(e) => e.product_id,
        };
        ensure_stream(envelope, product_id.0)?;

        let w = inner.products.entry(product_id).or_default();
        match ev {
            ProductEvent::ProductCreated(e) => {
                w.sku = e.sku;
                w.name = e.name;
                w.reorder_level = e.reorder_level;
            }
            ProductEvent::ProductUpdated(e) => w.name = e.name,
            ProductEvent::ReorderPolicySet(e) => w.reorder_level = e.reorder_level,
            ProductEvent::ProductArchived(_) => w.archived = true,
        }
        inner.evaluate(product_id, envelope.occurred_at());
        Ok(())
    }

    fn apply_stock(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let ev: StockEvent = decode(envelope)?;
        let product_id = ev.product_id();
        ensure_stream(envelope, product_id.0)?;

        let mut inner = self.inner.write().map_err(|_| ProjectionError::Poisoned)?;
        inner.products.entry(product_id).or_default().on_hand = Some(ev.on_hand());
        inner.evaluate(product_id, envelope.occurred_at());
        Ok(())
    }
}

impl Projection for StockAlertsProjection {
    fn name(&self) -> &'static str {
        "notifications.stock_alerts"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let is_product = envelope.aggregate_type() == streams::PRODUCT;
        if !(is_product || envelope.aggregate_type() == streams::STOCK) || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        if is_product {
            self.apply_product(envelope)?;
        } else {
            self.apply_stock(envelope)?;
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn reset(&self) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = Inner::default();
        }
        self.cursors.clear();
    }
}
