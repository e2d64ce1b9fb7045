//! Envelope builders shared by unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use invenhub_core::AggregateId;
use invenhub_events::{Event, EventEnvelope};
use invenhub_inventory::{StockAdjusted, StockEvent, StockOpened};
use invenhub_products::{Category, ProductCreated, ProductEvent, ProductId};
use invenhub_suppliers::SupplierId;

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().unwrap_or_default() + Duration::minutes(minutes)
}

pub fn envelope<E: Event + Serialize>(
    aggregate_type: &str,
    aggregate_id: AggregateId,
    seq: u64,
    event: &E,
) -> EventEnvelope<JsonValue> {
    EventEnvelope::new(
        Uuid::now_v7(),
        aggregate_id,
        aggregate_type,
        event.event_type(),
        seq,
        event.occurred_at(),
        serde_json::to_value(event).unwrap(),
    )
}

pub fn product_created(
    product_id: ProductId,
    sku: &str,
    supplier_id: Option<SupplierId>,
    reorder_level: i64,
) -> ProductEvent {
    ProductEvent::ProductCreated(ProductCreated {
        product_id,
        sku: sku.to_string(),
        name: format!("{sku} name"),
        description: String::new(),
        category: Category::Groceries,
        price: 250,
        cost: 150,
        supplier_id,
        reorder_level,
        reorder_quantity: 0,
        occurred_at: at(0),
    })
}

pub fn stock_opened(product_id: ProductId, on_hand: i64) -> StockEvent {
    StockEvent::Opened(StockOpened {
        product_id,
        on_hand,
        occurred_at: at(0),
    })
}

pub fn stock_adjusted(product_id: ProductId, delta: i64, on_hand: i64, minutes: i64) -> StockEvent {
    StockEvent::Adjusted(StockAdjusted {
        product_id,
        delta,
        reason: "count".to_string(),
        on_hand,
        occurred_at: at(minutes),
    })
}
