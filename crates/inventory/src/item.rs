use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invenhub_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use invenhub_events::Event;
use invenhub_products::ProductId;

/// Aggregate root: StockItem (the on-hand ledger of one product).
///
/// Shares its aggregate id with the product. Every event carries the
/// resulting `on_hand` so read models never recompute it.
///
/// # Invariants
/// - `on_hand` never goes below zero.
/// - Movement quantities are at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    id: ProductId,
    on_hand: i64,
    version: u64,
    created: bool,
}

impl StockItem {
    /// Create an empty, not-yet-opened aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            on_hand: 0,
            version: 0,
            created: false,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.id
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    pub fn is_open(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for StockItem {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenStock (product creation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenStock {
    pub product_id: ProductId,
    pub initial: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStock (goods in, usually a purchase order receipt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Purchase order the goods arrived on, if any.
    pub reference: Option<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SellStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub sale_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RestoreStock (voided sale or compensation of a failed one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStock {
    pub product_id: ProductId,
    pub quantity: i64,
    pub sale_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (manual count correction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Open(OpenStock),
    Receive(ReceiveStock),
    Sell(SellStock),
    Restore(RestoreStock),
    Adjust(AdjustStock),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOpened {
    pub product_id: ProductId,
    pub on_hand: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub product_id: ProductId,
    pub quantity: i64,
    pub reference: Option<AggregateId>,
    pub on_hand: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSold {
    pub product_id: ProductId,
    pub quantity: i64,
    pub sale_id: AggregateId,
    pub on_hand: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRestored {
    pub product_id: ProductId,
    pub quantity: i64,
    pub sale_id: AggregateId,
    pub on_hand: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: String,
    pub on_hand: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    Opened(StockOpened),
    Received(StockReceived),
    Sold(StockSold),
    Restored(StockRestored),
    Adjusted(StockAdjusted),
}

impl StockEvent {
    /// On-hand quantity after this event.
    pub fn on_hand(&self) -> i64 {
        match self {
            StockEvent::Opened(e) => e.on_hand,
            StockEvent::Received(e) => e.on_hand,
            StockEvent::Sold(e) => e.on_hand,
            StockEvent::Restored(e) => e.on_hand,
            StockEvent::Adjusted(e) => e.on_hand,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            StockEvent::Opened(e) => e.product_id,
            StockEvent::Received(e) => e.product_id,
            StockEvent::Sold(e) => e.product_id,
            StockEvent::Restored(e) => e.product_id,
            StockEvent::Adjusted(e) => e.product_id,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::Opened(_) => "inventory.stock.opened",
            StockEvent::Received(_) => "inventory.stock.received",
            StockEvent::Sold(_) => "inventory.stock.sold",
            StockEvent::Restored(_) => "inventory.stock.restored",
            StockEvent::Adjusted(_) => "inventory.stock.adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::Opened(e) => e.occurred_at,
            StockEvent::Received(e) => e.occurred_at,
            StockEvent::Sold(e) => e.occurred_at,
            StockEvent::Restored(e) => e.occurred_at,
            StockEvent::Adjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockItem {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        if let StockEvent::Opened(e) = event {
            self.id = e.product_id;
            self.created = true;
        }
        self.on_hand = event.on_hand();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::Open(cmd) => self.handle_open(cmd),
            StockCommand::Receive(cmd) => {
                self.ensure_open(cmd.product_id)?;
                let on_hand = self.add(cmd.quantity)?;
                Ok(vec![StockEvent::Received(StockReceived {
                    product_id: cmd.product_id,
                    quantity: cmd.quantity,
                    reference: cmd.reference,
                    on_hand,
                    occurred_at: cmd.occurred_at,
                })])
            }
            StockCommand::Sell(cmd) => self.handle_sell(cmd),
            StockCommand::Restore(cmd) => {
                self.ensure_open(cmd.product_id)?;
                let on_hand = self.add(cmd.quantity)?;
                Ok(vec![StockEvent::Restored(StockRestored {
                    product_id: cmd.product_id,
                    quantity: cmd.quantity,
                    sale_id: cmd.sale_id,
                    on_hand,
                    occurred_at: cmd.occurred_at,
                })])
            }
            StockCommand::Adjust(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl StockItem {
    fn ensure_open(&self, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn add(&self, quantity: i64) -> Result<i64, DomainError> {
        if quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        self.on_hand
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("quantity is too large"))
    }

    fn handle_open(&self, cmd: &OpenStock) -> Result<Vec<StockEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("stock already opened"));
        }
        if cmd.initial < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }

        Ok(vec![StockEvent::Opened(StockOpened {
            product_id: cmd.product_id,
            on_hand: cmd.initial,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sell(&self, cmd: &SellStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_open(cmd.product_id)?;
        if cmd.quantity < 1 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if self.on_hand < cmd.quantity {
            return Err(DomainError::invariant(format!(
                "insufficient stock: {} on hand, {} requested",
                self.on_hand, cmd.quantity
            )));
        }

        Ok(vec![StockEvent::Sold(StockSold {
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            sale_id: cmd.sale_id,
            on_hand: self.on_hand - cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<StockEvent>, DomainError> {
        self.ensure_open(cmd.product_id)?;
        if cmd.delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero"));
        }
        let on_hand = self
            .on_hand
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("adjustment is too large"))?;
        if on_hand < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![StockEvent::Adjusted(StockAdjusted {
            product_id: cmd.product_id,
            delta: cmd.delta,
            reason: cmd.reason.trim().to_string(),
            on_hand,
            occurred_at: cmd.occurred_at,
        })])
    }
}
