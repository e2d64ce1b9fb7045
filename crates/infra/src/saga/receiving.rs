//! Goods receipt: stock per line, then the purchase order transition.
//!
//! ```text
//! load order, check it can still be received
//!   ↓
//! for each line: ReceiveStock
//!   ↓ any failure → negative AdjustStock for lines already received
//! ReceiveGoods
//!   ↓ failure → negative AdjustStock for every line
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{error, info};

use invenhub_core::{Aggregate, AggregateId};
use invenhub_events::{EventBus, EventEnvelope};
use invenhub_inventory::{AdjustStock, ReceiveStock, StockCommand, StockItem};
use invenhub_products::ProductId;
use invenhub_purchasing::{LineItem, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, ReceiveGoods};

use super::checkout::COMPENSATION_RETRY_ATTEMPTS;
use crate::command_dispatcher::{CommandDispatcher, DEFAULT_RETRY_ATTEMPTS, DispatchError};
use crate::event_store::{EventStore, StoredEvent};
use crate::streams;

fn stock(id: AggregateId) -> StockItem {
    StockItem::empty(ProductId::new(id))
}

fn purchase_order(id: AggregateId) -> PurchaseOrder {
    PurchaseOrder::empty(PurchaseOrderId::new(id))
}

fn reverse<S, B>(
    dispatcher: &CommandDispatcher<S, B>,
    order_id: PurchaseOrderId,
    lines: &[LineItem],
    occurred_at: DateTime<Utc>,
) where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    for line in lines.iter().rev() {
        let cmd = StockCommand::Adjust(AdjustStock {
            product_id: line.product_id,
            delta: -line.quantity,
            reason: format!("receipt of {} reversed", order_id.po_number()),
            occurred_at,
        });
        if let Err(e) = dispatcher.dispatch_with_retry(
            COMPENSATION_RETRY_ATTEMPTS,
            line.product_id.0,
            streams::STOCK,
            &cmd,
            stock,
        ) {
            error!(%order_id, product_id = %line.product_id, error = %e, "failed to reverse received stock");
        }
    }
}

/// Add each line's quantity to stock and mark the purchase order received.
///
/// On failure stock is left as it was before the call and the order keeps
/// its status.
pub fn receive_purchase_order<S, B>(
    dispatcher: &CommandDispatcher<S, B>,
    cmd: ReceiveGoods,
) -> Result<Vec<StoredEvent>, DispatchError>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    let order_id = cmd.order_id;
    let occurred_at = cmd.occurred_at;
    let receive = PurchaseOrderCommand::ReceiveGoods(cmd);

    // A closed or unknown order is rejected before any stock moves.
    let order = dispatcher.load(order_id.0, streams::PURCHASE_ORDER, purchase_order)?;
    order.handle(&receive)?;

    let mut received: Vec<LineItem> = Vec::with_capacity(order.lines().len());
    for line in order.lines() {
        let cmd = StockCommand::Receive(ReceiveStock {
            product_id: line.product_id,
            quantity: line.quantity,
            reference: Some(order_id.0),
            occurred_at,
        });
        match dispatcher.dispatch_with_retry(DEFAULT_RETRY_ATTEMPTS, line.product_id.0, streams::STOCK, &cmd, stock) {
            Ok(_) => received.push(line.clone()),
            Err(e) => {
                info!(%order_id, product_id = %line.product_id, error = %e, "receipt rejected, compensating");
                reverse(dispatcher, order_id, &received, occurred_at);
                return Err(e);
            }
        }
    }

    match dispatcher.dispatch_with_retry(
        DEFAULT_RETRY_ATTEMPTS,
        order_id.0,
        streams::PURCHASE_ORDER,
        &receive,
        purchase_order,
    ) {
        Ok(committed) => Ok(committed),
        Err(e) => {
            info!(%order_id, error = %e, "order transition failed, compensating");
            reverse(dispatcher, order_id, &received, occurred_at);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use invenhub_events::InMemoryEventBus;
    use invenhub_inventory::OpenStock;
    use invenhub_purchasing::{CreatePurchaseOrder, OrderOrigin, PurchaseOrderStatus};
    use invenhub_suppliers::SupplierId;

    use super::*;
    use crate::event_store::InMemoryEventStore;
    use crate::test_support::at;

    type Dispatcher = CommandDispatcher<InMemoryEventStore, InMemoryEventBus<EventEnvelope<JsonValue>>>;

    fn open(d: &Dispatcher, product_id: ProductId, initial: i64) {
        let open = StockCommand::Open(OpenStock {
            product_id,
            initial,
            occurred_at: at(0),
        });
        d.dispatch(product_id.0, streams::STOCK, &open, stock).unwrap();
    }

    fn create_order(d: &Dispatcher, products: &[ProductId]) -> PurchaseOrderId {
        let order_id = PurchaseOrderId::generate();
        let create = PurchaseOrderCommand::Create(CreatePurchaseOrder {
            order_id,
            supplier_id: SupplierId::generate(),
            lines: products
                .iter()
                .map(|p| LineItem {
                    product_id: *p,
                    sku: "SKU".to_string(),
                    name: "item".to_string(),
                    quantity: 10,
                    unit_cost: 50,
                })
                .collect(),
            origin: OrderOrigin::Manual,
            notes: None,
            expected_at: None,
            occurred_at: at(1),
        });
        d.dispatch(order_id.0, streams::PURCHASE_ORDER, &create, purchase_order)
            .unwrap();
        order_id
    }

    fn on_hand(d: &Dispatcher, product_id: ProductId) -> i64 {
        d.load(product_id.0, streams::STOCK, stock).unwrap().on_hand()
    }

    fn receive(order_id: PurchaseOrderId) -> ReceiveGoods {
        ReceiveGoods {
            order_id,
            occurred_at: at(2),
        }
    }

    #[test]
    fn receiving_adds_each_line_once() {
        let d = CommandDispatcher::new(InMemoryEventStore::new(), InMemoryEventBus::new());
        let products: Vec<ProductId> = (0..2).map(|_| ProductId::generate()).collect();
        for (i, product_id) in products.iter().enumerate() {
            open(&d, *product_id, i as i64);
        }
        let order_id = create_order(&d, &products);

        receive_purchase_order(&d, receive(order_id)).unwrap();

        assert_eq!(on_hand(&d, products[0]), 10);
        assert_eq!(on_hand(&d, products[1]), 11);

        assert!(matches!(
            receive_purchase_order(&d, receive(order_id)),
            Err(DispatchError::InvariantViolation(_) | DispatchError::Conflict(_))
        ));
        assert_eq!(on_hand(&d, products[0]), 10);
    }

    #[test]
    fn failing_line_reverses_earlier_lines_and_keeps_the_order_open() {
        let d = CommandDispatcher::new(InMemoryEventStore::new(), InMemoryEventBus::new());
        let stocked = ProductId::generate();
        open(&d, stocked, 3);
        // No stock ledger was ever opened for this one.
        let unknown = ProductId::generate();
        let order_id = create_order(&d, &[stocked, unknown]);

        let err = receive_purchase_order(&d, receive(order_id)).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound));

        assert_eq!(on_hand(&d, stocked), 3);
        let order = d.load(order_id.0, streams::PURCHASE_ORDER, purchase_order).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Pending);
    }

    #[test]
    fn unknown_order_moves_no_stock() {
        let d = CommandDispatcher::new(InMemoryEventStore::new(), InMemoryEventBus::new());
        let product_id = ProductId::generate();
        open(&d, product_id, 1);

        assert!(receive_purchase_order(&d, receive(PurchaseOrderId::generate())).is_err());
        assert_eq!(on_hand(&d, product_id), 1);
    }
}
