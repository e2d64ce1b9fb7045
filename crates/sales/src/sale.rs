use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invenhub_auth::UserId;
use invenhub_core::{Aggregate, AggregateRoot, DomainError, line_amount, typed_id};
use invenhub_events::Event;
use invenhub_products::ProductId;

typed_id!(
    /// Sale (receipt) identifier.
    SaleId
);

impl SaleId {
    /// Human-facing receipt number derived from the id.
    pub fn receipt_no(&self) -> String {
        format!("RCP-{}", self.0.short())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileMoney,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile_money" | "mpesa" => Ok(PaymentMethod::MobileMoney),
            other => Err(DomainError::validation(format!("unknown payment method '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Voided,
}

/// Receipt line: a snapshot of the product at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Selling price per unit, in cents.
    pub unit_price: u64,
    /// Cost per unit at the time of sale, in cents.
    pub unit_cost: u64,
}

impl SaleLine {
    pub fn amount(&self) -> u64 {
        line_amount(self.quantity, self.unit_price)
    }

    pub fn cost_amount(&self) -> u64 {
        line_amount(self.quantity, self.unit_cost)
    }
}

/// Aggregate root: Sale.
///
/// # Invariants
/// - At least one line; every quantity ≥ 1; each product appears once.
/// - `discount ≤ subtotal`, so `total = subtotal − discount` never underflows.
/// - Only completed sales can be voided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    id: SaleId,
    lines: Vec<SaleLine>,
    discount: u64,
    payment_method: PaymentMethod,
    cashier_id: Option<UserId>,
    customer_name: Option<String>,
    status: SaleStatus,
    sold_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Sale {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SaleId) -> Self {
        Self {
            id,
            lines: Vec::new(),
            discount: 0,
            payment_method: PaymentMethod::Cash,
            cashier_id: None,
            customer_name: None,
            status: SaleStatus::Completed,
            sold_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn discount(&self) -> u64 {
        self.discount
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn cashier_id(&self) -> Option<UserId> {
        self.cashier_id
    }

    pub fn customer_name(&self) -> Option<&str> {
        self.customer_name.as_deref()
    }

    pub fn sold_at(&self) -> Option<DateTime<Utc>> {
        self.sold_at
    }

    pub fn subtotal(&self) -> u64 {
        subtotal(&self.lines)
    }

    pub fn total(&self) -> u64 {
        self.subtotal().saturating_sub(self.discount)
    }

    pub fn cost_total(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.cost_amount()))
    }
}

/// Σ quantity × unit_price.
pub fn subtotal(lines: &[SaleLine]) -> u64 {
    lines.iter().fold(0u64, |acc, l| acc.saturating_add(l.amount()))
}

impl AggregateRoot for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSale {
    pub sale_id: SaleId,
    pub lines: Vec<SaleLine>,
    pub discount: u64,
    pub payment_method: PaymentMethod,
    pub cashier_id: UserId,
    pub customer_name: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: VoidSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidSale {
    pub sale_id: SaleId,
    pub reason: String,
    pub voided_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleCommand {
    Record(RecordSale),
    Void(VoidSale),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecorded {
    pub sale_id: SaleId,
    pub receipt_no: String,
    pub lines: Vec<SaleLine>,
    pub discount: u64,
    pub payment_method: PaymentMethod,
    pub cashier_id: UserId,
    pub customer_name: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl SaleRecorded {
    pub fn subtotal(&self) -> u64 {
        subtotal(&self.lines)
    }

    pub fn total(&self) -> u64 {
        self.subtotal().saturating_sub(self.discount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleVoided {
    pub sale_id: SaleId,
    pub reason: String,
    pub voided_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    Recorded(SaleRecorded),
    Voided(SaleVoided),
}

impl Event for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::Recorded(_) => "sales.sale.recorded",
            SaleEvent::Voided(_) => "sales.sale.voided",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::Recorded(e) => e.occurred_at,
            SaleEvent::Voided(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sale {
    type Command = SaleCommand;
    type Event = SaleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleEvent::Recorded(e) => {
                self.id = e.sale_id;
                self.lines = e.lines.clone();
                self.discount = e.discount;
                self.payment_method = e.payment_method;
                self.cashier_id = Some(e.cashier_id);
                self.customer_name = e.customer_name.clone();
                self.status = SaleStatus::Completed;
                self.sold_at = Some(e.occurred_at);
                self.created = true;
            }
            SaleEvent::Voided(_) => {
                self.status = SaleStatus::Voided;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleCommand::Record(cmd) => self.handle_record(cmd),
            SaleCommand::Void(cmd) => self.handle_void(cmd),
        }
    }
}

impl Sale {
    fn handle_record(&self, cmd: &RecordSale) -> Result<Vec<SaleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sale already recorded"));
        }
        validate_lines(&cmd.lines)?;

        let subtotal = subtotal(&cmd.lines);
        if cmd.discount > subtotal {
            return Err(DomainError::validation(format!(
                "discount {} exceeds subtotal {}",
                cmd.discount, subtotal
            )));
        }

        Ok(vec![SaleEvent::Recorded(SaleRecorded {
            sale_id: cmd.sale_id,
            receipt_no: cmd.sale_id.receipt_no(),
            lines: cmd.lines.clone(),
            discount: cmd.discount,
            payment_method: cmd.payment_method,
            cashier_id: cmd.cashier_id,
            customer_name: cmd
                .customer_name
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_void(&self, cmd: &VoidSale) -> Result<Vec<SaleEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != cmd.sale_id {
            return Err(DomainError::invariant("sale_id mismatch"));
        }
        if self.status == SaleStatus::Voided {
            return Err(DomainError::invariant("sale is already voided"));
        }

        Ok(vec![SaleEvent::Voided(SaleVoided {
            sale_id: cmd.sale_id,
            reason: cmd.reason.trim().to_string(),
            voided_by: cmd.voided_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Checks shared by the aggregate and the service that prepares a sale.
pub fn validate_lines(lines: &[SaleLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("a sale needs at least one line"));
    }
    for (i, line) in lines.iter().enumerate() {
        if line.quantity < 1 {
            return Err(DomainError::validation(format!(
                "line {}: quantity must be at least 1",
                i + 1
            )));
        }
        if lines[..i].iter().any(|l| l.product_id == line.product_id) {
            return Err(DomainError::validation(format!(
                "line {}: product {} appears more than once",
                i + 1,
                line.sku
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use invenhub_events::execute;

    use super::*;

    fn line(quantity: i64, unit_price: u64, unit_cost: u64) -> SaleLine {
        SaleLine {
            product_id: ProductId::generate(),
            sku: "SKU".to_string(),
            name: "Item".to_string(),
            quantity,
            unit_price,
            unit_cost,
        }
    }

    fn record(lines: Vec<SaleLine>, discount: u64) -> RecordSale {
        RecordSale {
            sale_id: SaleId::generate(),
            lines,
            discount,
            payment_method: PaymentMethod::Cash,
            cashier_id: UserId::generate(),
            customer_name: Some("  ".to_string()),
            occurred_at: Utc::now(),
        }
    }

    fn recorded(lines: Vec<SaleLine>, discount: u64) -> Sale {
        let cmd = record(lines, discount);
        let mut sale = Sale::empty(cmd.sale_id);
        execute(&mut sale, &SaleCommand::Record(cmd)).unwrap();
        sale
    }

    #[test]
    fn totals_follow_lines_and_discount() {
        let sale = recorded(vec![line(2, 1_000, 600), line(1, 2_500, 2_000)], 500);
        assert_eq!(sale.subtotal(), 4_500);
        assert_eq!(sale.total(), 4_000);
        assert_eq!(sale.cost_total(), 3_200);
        assert_eq!(sale.customer_name(), None);
    }

    #[test]
    fn empty_sale_is_rejected() {
        let cmd = record(vec![], 0);
        let err = Sale::empty(cmd.sale_id).handle(&SaleCommand::Record(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn discount_above_subtotal_is_rejected() {
        let cmd = record(vec![line(1, 100, 50)], 101);
        let err = Sale::empty(cmd.sale_id).handle(&SaleCommand::Record(cmd)).unwrap_err();
        assert!(err.to_string().contains("exceeds subtotal"));
    }

    #[test]
    fn duplicate_products_are_rejected() {
        let first = line(1, 100, 50);
        let mut second = line(2, 100, 50);
        second.product_id = first.product_id;
        assert!(validate_lines(&[first, second]).is_err());
    }

    #[test]
    fn receipt_number_is_derived_from_id() {
        let sale = recorded(vec![line(1, 100, 50)], 0);
        let receipt = sale.id_typed().receipt_no();
        assert!(receipt.starts_with("RCP-"));
        assert_eq!(receipt.len(), 12);
    }

    #[test]
    fn void_once_only() {
        let mut sale = recorded(vec![line(1, 100, 50)], 0);
        let void = SaleCommand::Void(VoidSale {
            sale_id: sale.id_typed(),
            reason: "customer returned".to_string(),
            voided_by: UserId::generate(),
            occurred_at: Utc::now(),
        });
        execute(&mut sale, &void).unwrap();
        assert_eq!(sale.status(), SaleStatus::Voided);

        let err = sale.handle(&void).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn payment_method_parses_aliases() {
        assert_eq!("Mobile Money".parse::<PaymentMethod>().unwrap(), PaymentMethod::MobileMoney);
        assert_eq!("CARD".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

            /// A sale's total equals the sum of its lines minus the discount.
            #[test]
            fn total_is_sum_of_lines_minus_discount(
                raw in prop::collection::vec((1i64..50, 1u64..100_000, 0u64..100_000), 1..10),
                discount_pct in 0u64..=100,
            ) {
                let lines: Vec<SaleLine> = raw.iter().map(|(q, p, c)| line(*q, *p, *c)).collect();
                let expected_subtotal: u64 = raw.iter().map(|(q, p, _)| (*q as u64) * p).sum();
                let discount = expected_subtotal * discount_pct / 100;

                let sale = recorded(lines, discount);
                prop_assert_eq!(sale.subtotal(), expected_subtotal);
                prop_assert_eq!(sale.total(), expected_subtotal - discount);
            }
        }
    }
}
