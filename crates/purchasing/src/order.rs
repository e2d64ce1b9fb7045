use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invenhub_core::{Aggregate, AggregateRoot, DomainError, line_amount, typed_id};
use invenhub_events::Event;
use invenhub_products::ProductId;
use invenhub_suppliers::SupplierId;

typed_id!(
    /// Purchase order identifier.
    PurchaseOrderId
);

impl PurchaseOrderId {
    pub fn po_number(&self) -> String {
        format!("PO-{}", self.0.short())
    }
}

/// Purchase order status lifecycle.
///
/// `pending → ordered → received`; `pending | ordered → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Pending,
    Ordered,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Pending and ordered purchase orders still expect goods.
    pub fn is_open(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Pending | PurchaseOrderStatus::Ordered)
    }
}

impl core::str::FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PurchaseOrderStatus::Pending),
            "ordered" => Ok(PurchaseOrderStatus::Ordered),
            "received" => Ok(PurchaseOrderStatus::Received),
            "cancelled" | "canceled" => Ok(PurchaseOrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown status '{other}'"))),
        }
    }
}

/// Who raised the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOrigin {
    Manual,
    AutoReorder,
}

/// Purchase order line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Cost per unit in cents.
    pub unit_cost: u64,
}

impl LineItem {
    pub fn amount(&self) -> u64 {
        line_amount(self.quantity, self.unit_cost)
    }
}

/// Σ quantity × unit_cost.
pub fn total_cost(lines: &[LineItem]) -> u64 {
    lines.iter().fold(0u64, |acc, l| acc.saturating_add(l.amount()))
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier_id: Option<SupplierId>,
    origin: OrderOrigin,
    status: PurchaseOrderStatus,
    lines: Vec<LineItem>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            supplier_id: None,
            origin: OrderOrigin::Manual,
            status: PurchaseOrderStatus::Pending,
            lines: Vec::new(),
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn origin(&self) -> OrderOrigin {
        self.origin
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn total_cost(&self) -> u64 {
        total_cost(&self.lines)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder (with all of its lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub lines: Vec<LineItem>,
    pub origin: OrderOrigin,
    pub notes: Option<String>,
    pub expected_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkOrdered (sent to the supplier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkOrdered {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveGoods (all lines arrive at once).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveGoods {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    Create(CreatePurchaseOrder),
    MarkOrdered(MarkOrdered),
    ReceiveGoods(ReceiveGoods),
    Cancel(CancelPurchaseOrder),
    Delete(DeletePurchaseOrder),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub po_number: String,
    pub supplier_id: SupplierId,
    pub lines: Vec<LineItem>,
    pub origin: OrderOrigin,
    pub notes: Option<String>,
    pub expected_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderPlaced {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GoodsReceived.
///
/// Carries the lines so the application layer can add each quantity to the
/// product's stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub order_id: PurchaseOrderId,
    pub supplier_id: SupplierId,
    pub lines: Vec<LineItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCancelled {
    pub order_id: PurchaseOrderId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderDeleted {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderPlaced(PurchaseOrderPlaced),
    GoodsReceived(GoodsReceived),
    PurchaseOrderCancelled(PurchaseOrderCancelled),
    PurchaseOrderDeleted(PurchaseOrderDeleted),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::PurchaseOrderPlaced(_) => "purchasing.order.placed",
            PurchaseOrderEvent::GoodsReceived(_) => "purchasing.order.goods_received",
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => "purchasing.order.cancelled",
            PurchaseOrderEvent::PurchaseOrderDeleted(_) => "purchasing.order.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderPlaced(e) => e.occurred_at,
            PurchaseOrderEvent::GoodsReceived(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderCancelled(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.supplier_id = Some(e.supplier_id);
                self.origin = e.origin;
                self.lines = e.lines.clone();
                self.status = PurchaseOrderStatus::Pending;
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderPlaced(_) => self.status = PurchaseOrderStatus::Ordered,
            PurchaseOrderEvent::GoodsReceived(_) => self.status = PurchaseOrderStatus::Received,
            PurchaseOrderEvent::PurchaseOrderCancelled(_) => {
                self.status = PurchaseOrderStatus::Cancelled
            }
            PurchaseOrderEvent::PurchaseOrderDeleted(_) => self.deleted = true,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::Create(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::MarkOrdered(cmd) => {
                self.ensure_exists(cmd.order_id)?;
                if self.status != PurchaseOrderStatus::Pending {
                    return Err(self.transition_error("ordered"));
                }
                Ok(vec![PurchaseOrderEvent::PurchaseOrderPlaced(PurchaseOrderPlaced {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
            PurchaseOrderCommand::ReceiveGoods(cmd) => self.handle_receive(cmd),
            PurchaseOrderCommand::Cancel(cmd) => {
                self.ensure_exists(cmd.order_id)?;
                if !self.status.is_open() {
                    return Err(self.transition_error("cancelled"));
                }
                Ok(vec![PurchaseOrderEvent::PurchaseOrderCancelled(PurchaseOrderCancelled {
                    order_id: cmd.order_id,
                    reason: cmd.reason.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            PurchaseOrderCommand::Delete(cmd) => {
                self.ensure_exists(cmd.order_id)?;
                if self.status == PurchaseOrderStatus::Received {
                    return Err(DomainError::invariant(
                        "received purchase orders cannot be deleted",
                    ));
                }
                Ok(vec![PurchaseOrderEvent::PurchaseOrderDeleted(PurchaseOrderDeleted {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl PurchaseOrder {
    fn ensure_exists(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn transition_error(&self, target: &str) -> DomainError {
        DomainError::invariant(format!(
            "cannot move purchase order from {:?} to {target}",
            self.status
        ))
    }

    fn handle_create(&self, cmd: &CreatePurchaseOrder) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("a purchase order needs at least one line"));
        }
        for (i, line) in cmd.lines.iter().enumerate() {
            if line.quantity < 1 {
                return Err(DomainError::validation(format!(
                    "line {}: quantity must be at least 1",
                    i + 1
                )));
            }
            if cmd.lines[..i].iter().any(|l| l.product_id == line.product_id) {
                return Err(DomainError::validation(format!(
                    "line {}: product {} appears more than once",
                    i + 1,
                    line.sku
                )));
            }
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(PurchaseOrderCreated {
            order_id: cmd.order_id,
            po_number: cmd.order_id.po_number(),
            supplier_id: cmd.supplier_id,
            lines: cmd.lines.clone(),
            origin: cmd.origin,
            notes: cmd
                .notes
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            expected_at: cmd.expected_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveGoods) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_exists(cmd.order_id)?;
        if !self.status.is_open() {
            return Err(self.transition_error("received"));
        }
        let supplier_id = self
            .supplier_id
            .ok_or_else(|| DomainError::invariant("purchase order has no supplier"))?;

        Ok(vec![PurchaseOrderEvent::GoodsReceived(GoodsReceived {
            order_id: cmd.order_id,
            supplier_id,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
