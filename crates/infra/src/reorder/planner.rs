use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use invenhub_products::ProductId;
use invenhub_purchasing::{LineItem, OrderOrigin};
use invenhub_suppliers::SupplierId;

use crate::projections::{ProductReadModel, PurchaseOrderReadModel, StockLevel, SupplierReadModel};

pub const DEFAULT_COOLDOWN_HOURS: i64 = 24;

/// Read-model snapshot the planner decides from.
#[derive(Debug, Clone, Copy)]
pub struct ReorderSnapshot<'a> {
    pub products: &'a [ProductReadModel],
    pub stock: &'a [StockLevel],
    pub suppliers: &'a [SupplierReadModel],
    pub orders: &'a [PurchaseOrderReadModel],
    /// Last automatic reorder per product known to the caller, on top of
    /// what the purchase orders show.
    pub cooldowns: &'a HashMap<ProductId, DateTime<Utc>>,
}

/// One purchase order the planner wants filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOrder {
    pub supplier_id: SupplierId,
    pub lines: Vec<LineItem>,
}

/// Decides which low-stock products to reorder and groups them by supplier.
#[derive(Debug, Clone, Copy)]
pub struct ReorderPlanner {
    cooldown: Duration,
}

impl Default for ReorderPlanner {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_COOLDOWN_HOURS))
    }
}

impl ReorderPlanner {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Quantity to order: the product's reorder quantity, or enough to reach
    /// twice the reorder level.
    pub fn order_quantity(product: &ProductReadModel, on_hand: i64) -> i64 {
        if product.reorder_quantity > 0 {
            product.reorder_quantity
        } else {
            (2 * product.reorder_level - on_hand).max(1)
        }
    }

    pub fn plan(&self, snapshot: &ReorderSnapshot<'_>, now: DateTime<Utc>) -> Vec<PlannedOrder> {
        let on_hand: HashMap<ProductId, i64> = snapshot.stock.iter().map(|s| (s.product_id, s.on_hand)).collect();

        let active_suppliers: HashSet<SupplierId> = snapshot
            .suppliers
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.supplier_id)
            .collect();

        let on_open_orders: HashSet<ProductId> = snapshot
            .orders
            .iter()
            .filter(|o| o.status.is_open())
            .flat_map(|o| o.lines.iter().map(|l| l.product_id))
            .collect();

        let last_reorder = last_auto_reorders(snapshot.orders, snapshot.cooldowns);

        let mut grouped: BTreeMap<SupplierId, Vec<LineItem>> = BTreeMap::new();
        for product in snapshot.products {
            let Some(supplier_id) = product.supplier_id else {
                continue;
            };
            if !product.is_active() || product.reorder_level <= 0 {
                continue;
            }
            let Some(&qty) = on_hand.get(&product.product_id) else {
                continue;
            };
            if qty > product.reorder_level
                || !active_suppliers.contains(&supplier_id)
                || on_open_orders.contains(&product.product_id)
            {
                continue;
            }
            if last_reorder
                .get(&product.product_id)
                .is_some_and(|last| now - *last < self.cooldown)
            {
                continue;
            }

            grouped.entry(supplier_id).or_default().push(LineItem {
                product_id: product.product_id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                quantity: Self::order_quantity(product, qty),
                unit_cost: product.cost,
            });
        }

        grouped
            .into_iter()
            .map(|(supplier_id, mut lines)| {
                lines.sort_by(|a, b| a.sku.cmp(&b.sku));
                PlannedOrder { supplier_id, lines }
            })
            .collect()
    }
}

/// Most recent automatic reorder per product, from order history and the
/// caller's own record (whichever is later).
pub fn last_auto_reorders(
    orders: &[PurchaseOrderReadModel],
    known: &HashMap<ProductId, DateTime<Utc>>,
) -> HashMap<ProductId, DateTime<Utc>> {
    let mut last = known.clone();
    for order in orders.iter().filter(|o| o.origin == OrderOrigin::AutoReorder) {
        for line in &order.lines {
            last.entry(line.product_id)
                .and_modify(|t| *t = (*t).max(order.created_at))
                .or_insert(order.created_at);
        }
    }
    last
}
