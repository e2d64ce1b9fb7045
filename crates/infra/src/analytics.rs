//! Dashboard figures computed from read models.
//!
//! Pure functions: callers pass read-model snapshots, nothing here touches
//! stores or clocks.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use invenhub_products::ProductId;
use invenhub_sales::{PaymentMethod, SaleStatus};

use crate::projections::{ProductReadModel, SaleReadModel, StockLevel};

/// Number of entries in [`SalesSummary::top_products`].
pub const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub count: usize,
    pub revenue: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub count: usize,
    pub revenue: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub units: i64,
    pub revenue: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Completed sales only.
    pub count: usize,
    pub units: i64,
    pub revenue: u64,
    pub cost: u64,
    pub gross_profit: i64,
    pub average_ticket: u64,
    pub discounts: u64,
    pub voided_count: usize,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub daily: Vec<DailyRevenue>,
    pub top_products: Vec<ProductSales>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub sku_count: usize,
    pub units_on_hand: i64,
    pub stock_value_at_cost: u64,
    pub stock_value_at_retail: u64,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
}

fn to_signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Summarize sales whose `sold_at` falls in `[from, to]` (either bound optional).
///
/// Revenue is net of discounts; per-product revenue is the gross line amount
/// because discounts apply to the whole receipt.
pub fn sales_summary(
    sales: &[SaleReadModel],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> SalesSummary {
    let in_range = sales
        .iter()
        .filter(|s| from.is_none_or(|f| s.sold_at >= f) && to.is_none_or(|t| s.sold_at <= t));

    let mut count = 0usize;
    let mut voided_count = 0usize;
    let mut units = 0i64;
    let mut revenue = 0u64;
    let mut cost = 0u64;
    let mut discounts = 0u64;
    let mut by_method: HashMap<PaymentMethod, PaymentMethodTotal> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, DailyRevenue> = BTreeMap::new();
    let mut products: HashMap<ProductId, ProductSales> = HashMap::new();

    for sale in in_range {
        if sale.status == SaleStatus::Voided {
            voided_count += 1;
            continue;
        }

        count += 1;
        units += sale.units();
        revenue = revenue.saturating_add(sale.total);
        cost = cost.saturating_add(sale.cost_total);
        discounts = discounts.saturating_add(sale.discount);

        let m = by_method.entry(sale.payment_method).or_insert(PaymentMethodTotal {
            payment_method: sale.payment_method,
            count: 0,
            revenue: 0,
        });
        m.count += 1;
        m.revenue = m.revenue.saturating_add(sale.total);

        let date = sale.sold_at.date_naive();
        let d = daily.entry(date).or_insert(DailyRevenue {
            date,
            count: 0,
            revenue: 0,
        });
        d.count += 1;
        d.revenue = d.revenue.saturating_add(sale.total);

        for line in &sale.lines {
            let p = products.entry(line.product_id).or_insert_with(|| ProductSales {
                product_id: line.product_id,
                sku: line.sku.clone(),
                name: line.name.clone(),
                units: 0,
                revenue: 0,
            });
            p.units += line.quantity;
            p.revenue = p.revenue.saturating_add(line.amount());
        }
    }

    let mut by_payment_method: Vec<_> = by_method.into_values().collect();
    by_payment_method.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(b.count.cmp(&a.count)));

    let mut top_products: Vec<_> = products.into_values().collect();
    top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.sku.cmp(&b.sku)));
    top_products.truncate(TOP_PRODUCTS);

    SalesSummary {
        from,
        to,
        count,
        units,
        revenue,
        cost,
        gross_profit: to_signed(revenue) - to_signed(cost),
        average_ticket: if count == 0 { 0 } else { revenue / count as u64 },
        discounts,
        voided_count,
        by_payment_method,
        daily: daily.into_values().collect(),
        top_products,
    }
}

/// Stock position across active products.
///
/// Low stock means `0 < on_hand <= reorder_level`; products without a stock
/// level count as out of stock.
pub fn inventory_summary(products: &[ProductReadModel], stock: &[StockLevel]) -> InventorySummary {
    let on_hand: HashMap<ProductId, i64> = stock.iter().map(|s| (s.product_id, s.on_hand)).collect();

    products
        .iter()
        .filter(|p| p.is_active())
        .fold(InventorySummary::default(), |mut acc, p| {
            let qty = on_hand.get(&p.product_id).copied().unwrap_or(0).max(0);
            acc.sku_count += 1;
            acc.units_on_hand += qty;
            acc.stock_value_at_cost = acc
                .stock_value_at_cost
                .saturating_add(invenhub_core::line_amount(qty, p.cost));
            acc.stock_value_at_retail = acc
                .stock_value_at_retail
                .saturating_add(invenhub_core::line_amount(qty, p.price));
            if qty == 0 {
                acc.out_of_stock_count += 1;
            } else if qty <= p.reorder_level {
                acc.low_stock_count += 1;
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use invenhub_auth::UserId;
    use invenhub_products::{Category, ProductStatus};
    use invenhub_sales::{SaleId, SaleLine};

    use super::*;
    use crate::test_support::at;

    fn line(product_id: ProductId, sku: &str, quantity: i64, unit_price: u64, unit_cost: u64) -> SaleLine {
        SaleLine {
            product_id,
            sku: sku.to_string(),
            name: sku.to_lowercase(),
            quantity,
            unit_price,
            unit_cost,
        }
    }

    fn sale(lines: Vec<SaleLine>, discount: u64, method: PaymentMethod, sold_at: DateTime<Utc>) -> SaleReadModel {
        let subtotal = invenhub_sales::subtotal(&lines);
        SaleReadModel {
            sale_id: SaleId::generate(),
            receipt_no: "RCP-TEST".to_string(),
            cost_total: lines.iter().map(SaleLine::cost_amount).sum(),
            lines,
            subtotal,
            discount,
            total: subtotal - discount,
            payment_method: method,
            cashier_id: UserId::generate(),
            customer_name: None,
            status: SaleStatus::Completed,
            sold_at,
            voided_at: None,
            void_reason: None,
        }
    }

    #[test]
    fn summary_totals_exclude_voided_sales() {
        let milk = ProductId::generate();
        let bread = ProductId::generate();

        let mut voided = sale(vec![line(milk, "MILK", 10, 100, 50)], 0, PaymentMethod::Cash, at(5));
        voided.status = SaleStatus::Voided;

        let sales = vec![
            sale(vec![line(milk, "MILK", 2, 100, 60), line(bread, "BREAD", 1, 300, 200)], 50, PaymentMethod::Cash, at(0)),
            sale(vec![line(bread, "BREAD", 2, 300, 200)], 0, PaymentMethod::Card, at(60 * 24)),
            voided,
        ];

        let s = sales_summary(&sales, None, None);
        assert_eq!(s.count, 2);
        assert_eq!(s.voided_count, 1);
        assert_eq!(s.units, 5);
        assert_eq!(s.revenue, 450 + 600);
        assert_eq!(s.cost, 320 + 400);
        assert_eq!(s.gross_profit, 1050 - 720);
        assert_eq!(s.discounts, 50);
        assert_eq!(s.average_ticket, 525);
        assert_eq!(s.daily.len(), 2);
        assert_eq!(s.by_payment_method[0].payment_method, PaymentMethod::Card);
        assert_eq!(s.top_products[0].sku, "BREAD");
        assert_eq!(s.top_products[0].units, 3);
    }

    #[test]
    fn summary_honours_date_bounds() {
        let p = ProductId::generate();
        let sales = vec![
            sale(vec![line(p, "P", 1, 100, 10)], 0, PaymentMethod::Cash, at(0)),
            sale(vec![line(p, "P", 1, 100, 10)], 0, PaymentMethod::Cash, at(0) + Duration::days(3)),
        ];

        let s = sales_summary(&sales, Some(at(0) + Duration::days(1)), None);
        assert_eq!(s.count, 1);

        let empty = sales_summary(&sales, Some(at(0) + Duration::days(10)), None);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.average_ticket, 0);
        assert!(empty.top_products.is_empty());
    }

    #[test]
    fn top_products_is_limited() {
        let lines: Vec<_> = (0..8)
            .map(|i| line(ProductId::generate(), &format!("SKU-{i}"), 1, 100 + i, 10))
            .collect();
        let s = sales_summary(&[sale(lines, 0, PaymentMethod::MobileMoney, at(0))], None, None);
        assert_eq!(s.top_products.len(), TOP_PRODUCTS);
        assert_eq!(s.top_products[0].sku, "SKU-7");
    }

    fn product(reorder_level: i64, price: u64, cost: u64, status: ProductStatus) -> ProductReadModel {
        ProductReadModel {
            product_id: ProductId::generate(),
            sku: "X".to_string(),
            name: "x".to_string(),
            description: String::new(),
            category: Category::Other,
            price,
            cost,
            supplier_id: None,
            reorder_level,
            reorder_quantity: 0,
            status,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn inventory_summary_values_active_stock() {
        let healthy = product(2, 500, 300, ProductStatus::Active);
        let low = product(5, 100, 50, ProductStatus::Active);
        let empty = product(0, 100, 50, ProductStatus::Active);
        let archived = product(0, 100, 50, ProductStatus::Archived);

        let stock = vec![
            StockLevel { product_id: healthy.product_id, on_hand: 10, updated_at: at(0) },
            StockLevel { product_id: low.product_id, on_hand: 3, updated_at: at(0) },
            StockLevel { product_id: archived.product_id, on_hand: 99, updated_at: at(0) },
        ];

        let s = inventory_summary(&[healthy, low, empty, archived], &stock);
        assert_eq!(s.sku_count, 3);
        assert_eq!(s.units_on_hand, 13);
        assert_eq!(s.stock_value_at_cost, 10 * 300 + 3 * 50);
        assert_eq!(s.stock_value_at_retail, 10 * 500 + 3 * 100);
        assert_eq!(s.low_stock_count, 1);
        assert_eq!(s.out_of_stock_count, 1);
    }
}
