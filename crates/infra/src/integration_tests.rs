//! Integration tests for the full event-sourced pipeline.
//!
//! Command → EventStore → ProjectionBus → read models (→ subscribers)

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use invenhub_auth::UserId;
    use invenhub_core::AggregateId;
    use invenhub_events::EventBus;
    use invenhub_inventory::{OpenStock, StockCommand, StockItem};
    use invenhub_products::{Category, CreateProduct, Product, ProductCommand, ProductId, ProductStatus};
    use invenhub_purchasing::{
        CreatePurchaseOrder, OrderOrigin, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
        PurchaseOrderStatus, ReceiveGoods,
    };
    use invenhub_sales::{PaymentMethod, RecordSale, SaleId, SaleLine};
    use invenhub_suppliers::{ContactInfo, RegisterSupplier, Supplier, SupplierCommand, SupplierId};

    use crate::alerts::AlertKind;
    use crate::analytics::{inventory_summary, sales_summary};
    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::event_store::{EventStore, InMemoryEventStore, JsonFileEventStore};
    use crate::projections::{ProjectionBus, ReadModels};
    use crate::reorder::{PlannedOrder, ReorderExecutor, ReorderJob, ReorderPlanner};
    use crate::saga::{receive_purchase_order, record_sale};
    use crate::streams;
    use crate::test_support::at;

    type Dispatcher<S> = CommandDispatcher<S, Arc<ProjectionBus>>;

    fn setup<S: EventStore>(store: S) -> (Dispatcher<S>, ReadModels) {
        let read_models = ReadModels::new();
        let bus = Arc::new(read_models.bus());
        (CommandDispatcher::new(store, bus), read_models)
    }

    fn register_supplier<S: EventStore>(d: &Dispatcher<S>) -> SupplierId {
        let supplier_id = SupplierId::generate();
        let cmd = SupplierCommand::Register(RegisterSupplier {
            supplier_id,
            name: "Fresh Farms".to_string(),
            contact: ContactInfo::default(),
            contact_person: None,
            lead_time_days: 2,
            occurred_at: at(0),
        });
        d.dispatch(supplier_id.0, streams::SUPPLIER, &cmd, |id: AggregateId| {
            Supplier::empty(SupplierId::new(id))
        })
        .unwrap();
        supplier_id
    }

    fn create_product<S: EventStore>(
        d: &Dispatcher<S>,
        sku: &str,
        supplier_id: Option<SupplierId>,
        reorder_level: i64,
        initial: i64,
    ) -> ProductId {
        let product_id = ProductId::generate();
        let cmd = ProductCommand::CreateProduct(CreateProduct {
            product_id,
            sku: sku.to_string(),
            name: format!("{sku} item"),
            description: String::new(),
            category: Category::Groceries,
            price: 300,
            cost: 180,
            supplier_id,
            reorder_level,
            reorder_quantity: 0,
            occurred_at: at(0),
        });
        d.dispatch(product_id.0, streams::PRODUCT, &cmd, |id: AggregateId| {
            Product::empty(ProductId::new(id))
        })
        .unwrap();

        let open = StockCommand::Open(OpenStock {
            product_id,
            initial,
            occurred_at: at(0),
        });
        d.dispatch(product_id.0, streams::STOCK, &open, |id: AggregateId| {
            StockItem::empty(ProductId::new(id))
        })
        .unwrap();
        product_id
    }

    fn sell<S: EventStore>(d: &Dispatcher<S>, read_models: &ReadModels, product_id: ProductId, quantity: i64) -> SaleId {
        let product = read_models.products.get(&product_id).unwrap();
        let sale_id = SaleId::generate();
        record_sale(
            d,
            RecordSale {
                sale_id,
                lines: vec![SaleLine {
                    product_id,
                    sku: product.sku,
                    name: product.name,
                    quantity,
                    unit_price: product.price,
                    unit_cost: product.cost,
                }],
                discount: 0,
                payment_method: PaymentMethod::Cash,
                cashier_id: UserId::generate(),
                customer_name: None,
                occurred_at: at(5),
            },
        )
        .unwrap();
        sale_id
    }

    #[test]
    fn commands_update_read_models_before_dispatch_returns() {
        let (d, rm) = setup(InMemoryEventStore::new());
        let product_id = create_product(&d, "TEA-100", None, 3, 5);

        assert_eq!(rm.products.get(&product_id).unwrap().sku, "TEA-100");
        assert_eq!(rm.stock.on_hand(&product_id), 5);
        assert!(rm.alerts.open_for(&product_id).is_none());

        let sale_id = sell(&d, &rm, product_id, 3);
        assert_eq!(rm.stock.on_hand(&product_id), 2);
        assert_eq!(rm.sales.get(&sale_id).unwrap().total, 900);
        assert_eq!(rm.alerts.open_for(&product_id).unwrap().kind, AlertKind::LowStock);

        let summary = sales_summary(&rm.sales.list_between(None, None), None, None);
        assert_eq!(summary.revenue, 900);
        assert_eq!(summary.gross_profit, 900 - 540);

        let inventory = inventory_summary(&rm.products.list(), &rm.stock.list());
        assert_eq!(inventory.units_on_hand, 2);
        assert_eq!(inventory.low_stock_count, 1);
    }

    #[test]
    fn product_and_stock_ledger_share_an_id_as_separate_streams() {
        let (d, rm) = setup(InMemoryEventStore::new());
        let d = Arc::new(d);
        let supplier_id = register_supplier(&d);
        let product_id = create_product(&d, "FLOUR-1KG", Some(supplier_id), 2, 5);
        sell(&d, &rm, product_id, 4);

        let order_id = PurchaseOrderId::generate();
        let create = PurchaseOrderCommand::Create(CreatePurchaseOrder {
            order_id,
            supplier_id,
            lines: vec![invenhub_purchasing::LineItem {
                product_id,
                sku: "FLOUR-1KG".to_string(),
                name: "Flour".to_string(),
                quantity: 6,
                unit_cost: 180,
            }],
            origin: OrderOrigin::Manual,
            notes: None,
            expected_at: None,
            occurred_at: at(6),
        });
        d.dispatch(order_id.0, streams::PURCHASE_ORDER, &create, |id: AggregateId| {
            PurchaseOrder::empty(PurchaseOrderId::new(id))
        })
        .unwrap();
        receive_purchase_order(
            &d,
            ReceiveGoods {
                order_id,
                occurred_at: at(7),
            },
        )
        .unwrap();

        let product = d.store().load_stream(streams::PRODUCT, product_id.0).unwrap();
        let stock = d.store().load_stream(streams::STOCK, product_id.0).unwrap();
        assert_eq!(product.len(), 1);
        assert_eq!(
            stock.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
            vec!["inventory.stock.opened", "inventory.stock.sold", "inventory.stock.received"]
        );
        assert_eq!(rm.stock.on_hand(&product_id), 7);
        assert_eq!(rm.products.get(&product_id).unwrap().sku, "FLOUR-1KG");
    }

    #[test]
    fn subscribers_see_events_after_read_models() {
        let (d, rm) = setup(InMemoryEventStore::new());
        let sub = d.bus().subscribe();

        let product_id = create_product(&d, "SOAP-1", None, 0, 1);

        let first = sub.try_recv().unwrap();
        assert_eq!(first.event_type(), "products.product.created");
        assert!(rm.products.get(&product_id).is_some());
        assert_eq!(sub.try_recv().unwrap().event_type(), "inventory.stock.opened");
    }

    #[test]
    fn rebuild_from_file_log_reproduces_read_models() {
        let dir = std::env::temp_dir().join(format!("invenhub-rebuild-{}", AggregateId::new()));

        let (product_id, sale_id) = {
            let (d, rm) = setup(JsonFileEventStore::open(&dir).unwrap());
            let product_id = create_product(&d, "RICE-5", None, 2, 10);
            let sale_id = sell(&d, &rm, product_id, 4);
            (product_id, sale_id)
        };

        let store = JsonFileEventStore::open(&dir).unwrap();
        let rm = ReadModels::new();
        let replayed = rm.bus().rebuild(&store).unwrap();

        assert_eq!(replayed, 4);
        assert_eq!(rm.stock.on_hand(&product_id), 6);
        assert_eq!(rm.sales.get(&sale_id).unwrap().lines[0].quantity, 4);
        assert_eq!(rm.products.get(&product_id).unwrap().status, ProductStatus::Active);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn redelivered_envelopes_do_not_double_count() {
        let (d, rm) = setup(InMemoryEventStore::new());
        let product_id = create_product(&d, "MILK-1L", None, 0, 8);
        sell(&d, &rm, product_id, 3);

        for stored in d.store().load_stream(streams::STOCK, product_id.0).unwrap() {
            d.bus().publish(stored.to_envelope()).unwrap();
        }
        assert_eq!(rm.stock.on_hand(&product_id), 5);
    }

    struct DispatchingExecutor {
        dispatcher: Arc<Dispatcher<InMemoryEventStore>>,
    }

    impl ReorderExecutor for DispatchingExecutor {
        type Error = DispatchError;

        fn file_order(&self, order: &PlannedOrder) -> Result<PurchaseOrderId, Self::Error> {
            let order_id = PurchaseOrderId::generate();
            let cmd = PurchaseOrderCommand::Create(CreatePurchaseOrder {
                order_id,
                supplier_id: order.supplier_id,
                lines: order.lines.clone(),
                origin: OrderOrigin::AutoReorder,
                notes: Some("automatic reorder".to_string()),
                expected_at: None,
                occurred_at: at(10),
            });
            self.dispatcher.dispatch(order_id.0, streams::PURCHASE_ORDER, &cmd, |id: AggregateId| {
                PurchaseOrder::empty(PurchaseOrderId::new(id))
            })?;
            Ok(order_id)
        }
    }

    #[test]
    fn auto_reorder_files_once_then_receipt_clears_the_alert() {
        let (d, rm) = setup(InMemoryEventStore::new());
        let d = Arc::new(d);
        let supplier_id = register_supplier(&d);
        let low = create_product(&d, "BEANS", Some(supplier_id), 5, 2);
        let fine = create_product(&d, "OIL", Some(supplier_id), 5, 50);

        let job = ReorderJob::new(
            rm.clone(),
            ReorderPlanner::new(Duration::hours(24)),
            Arc::new(DispatchingExecutor { dispatcher: d.clone() }),
        );

        let outcome = job.run_once(at(10)).unwrap();
        assert_eq!(outcome.orders.len(), 1);
        let po = rm.purchase_orders.get(&outcome.orders[0]).unwrap();
        assert_eq!(po.origin, OrderOrigin::AutoReorder);
        assert_eq!(po.lines.len(), 1);
        assert_eq!(po.lines[0].product_id, low);
        assert_eq!(po.lines[0].quantity, 8);
        assert!(po.lines.iter().all(|l| l.product_id != fine));

        assert!(job.run_once(at(20)).unwrap().orders.is_empty());

        receive_purchase_order(
            &d,
            ReceiveGoods {
                order_id: po.order_id,
                occurred_at: at(30),
            },
        )
        .unwrap();
        assert_eq!(rm.stock.on_hand(&low), 10);
        assert_eq!(
            rm.purchase_orders.get(&po.order_id).unwrap().status,
            PurchaseOrderStatus::Received
        );
        assert!(rm.alerts.open_for(&low).is_none());
    }
}
