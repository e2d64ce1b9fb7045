use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invenhub_core::{Aggregate, AggregateRoot, DomainError, typed_id};
use invenhub_events::Event;
use invenhub_suppliers::SupplierId;

use crate::Category;

typed_id!(
    /// Product identifier. The product's stock ledger shares this id.
    ProductId
);

/// Product status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Archived,
}

/// Aggregate root: Product (catalog entry).
///
/// Prices are in minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: String,
    category: Category,
    price: u64,
    cost: u64,
    supplier_id: Option<SupplierId>,
    reorder_level: i64,
    reorder_quantity: i64,
    status: ProductStatus,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            sku: String::new(),
            name: String::new(),
            description: String::new(),
            category: Category::Other,
            price: 0,
            cost: 0,
            supplier_id: None,
            reorder_level: 0,
            reorder_quantity: 0,
            status: ProductStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    pub fn reorder_quantity(&self) -> i64 {
        self.reorder_quantity
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    /// Only active products can be sold.
    pub fn can_be_sold(&self) -> bool {
        self.created && self.status == ProductStatus::Active
    }

    /// Unit margin (price − cost), zero when sold at a loss.
    pub fn margin(&self) -> u64 {
        self.price.saturating_sub(self.cost)
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
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
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct.
///
/// `None` leaves a field unchanged. For `supplier_id`, `Some(None)` unlinks
/// the supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<u64>,
    pub cost: Option<u64>,
    pub supplier_id: Option<Option<SupplierId>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetReorderPolicy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReorderPolicy {
    pub product_id: ProductId,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    SetReorderPolicy(SetReorderPolicy),
    ArchiveProduct(ArchiveProduct),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
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
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated (snapshot of the editable details after the change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub price: u64,
    pub cost: u64,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReorderPolicySet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderPolicySet {
    pub product_id: ProductId,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductArchived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductArchived {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    ReorderPolicySet(ReorderPolicySet),
    ProductArchived(ProductArchived),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductUpdated(_) => "products.product.updated",
            ProductEvent::ReorderPolicySet(_) => "products.product.reorder_policy_set",
            ProductEvent::ProductArchived(_) => "products.product.archived",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::ReorderPolicySet(e) => e.occurred_at,
            ProductEvent::ProductArchived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.sku = e.sku.clone();
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.category = e.category;
                self.price = e.price;
                self.cost = e.cost;
                self.supplier_id = e.supplier_id;
                self.reorder_level = e.reorder_level;
                self.reorder_quantity = e.reorder_quantity;
                self.status = ProductStatus::Active;
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.category = e.category;
                self.price = e.price;
                self.cost = e.cost;
                self.supplier_id = e.supplier_id;
            }
            ProductEvent::ReorderPolicySet(e) => {
                self.reorder_level = e.reorder_level;
                self.reorder_quantity = e.reorder_quantity;
            }
            ProductEvent::ProductArchived(_) => {
                self.status = ProductStatus::Archived;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::SetReorderPolicy(cmd) => self.handle_reorder_policy(cmd),
            ProductCommand::ArchiveProduct(cmd) => self.handle_archive(cmd),
        }
    }
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.status == ProductStatus::Archived {
            return Err(DomainError::invariant("archived products cannot be changed"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.sku.trim().is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.price == 0 {
            return Err(DomainError::validation("price must be greater than zero"));
        }
        validate_policy(cmd.reorder_level, cmd.reorder_quantity)?;

        // SKU uniqueness spans products, so the service checks it against the
        // catalog read model before dispatching.
        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            sku: normalize_sku(&cmd.sku),
            name: cmd.name.trim().to_string(),
            description: cmd.description.trim().to_string(),
            category: cmd.category,
            price: cmd.price,
            cost: cmd.cost,
            supplier_id: cmd.supplier_id,
            reorder_level: cmd.reorder_level,
            reorder_quantity: cmd.reorder_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_editable()?;

        let name = match &cmd.name {
            Some(name) if name.trim().is_empty() => {
                return Err(DomainError::validation("name cannot be empty"));
            }
            Some(name) => name.trim().to_string(),
            None => self.name.clone(),
        };
        let price = cmd.price.unwrap_or(self.price);
        if price == 0 {
            return Err(DomainError::validation("price must be greater than zero"));
        }

        let updated = ProductUpdated {
            product_id: self.id,
            name,
            description: cmd
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| self.description.clone()),
            category: cmd.category.unwrap_or(self.category),
            price,
            cost: cmd.cost.unwrap_or(self.cost),
            supplier_id: cmd.supplier_id.unwrap_or(self.supplier_id),
            occurred_at: cmd.occurred_at,
        };

        let unchanged = updated.name == self.name
            && updated.description == self.description
            && updated.category == self.category
            && updated.price == self.price
            && updated.cost == self.cost
            && updated.supplier_id == self.supplier_id;
        if unchanged {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductUpdated(updated)])
    }

    fn handle_reorder_policy(&self, cmd: &SetReorderPolicy) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_editable()?;
        self.ensure_product_id(cmd.product_id)?;
        validate_policy(cmd.reorder_level, cmd.reorder_quantity)?;

        if cmd.reorder_level == self.reorder_level && cmd.reorder_quantity == self.reorder_quantity {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ReorderPolicySet(ReorderPolicySet {
            product_id: cmd.product_id,
            reorder_level: cmd.reorder_level,
            reorder_quantity: cmd.reorder_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_product_id(cmd.product_id)?;

        if self.status == ProductStatus::Archived {
            return Err(DomainError::conflict("product is already archived"));
        }

        Ok(vec![ProductEvent::ProductArchived(ProductArchived {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Canonical SKU form: trimmed and upper-cased.
pub fn normalize_sku(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn validate_policy(level: i64, quantity: i64) -> Result<(), DomainError> {
    if level < 0 {
        return Err(DomainError::validation("reorder level cannot be negative"));
    }
    if quantity < 0 {
        return Err(DomainError::validation("reorder quantity cannot be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(product_id: ProductId) -> CreateProduct {
        CreateProduct {
            product_id,
            sku: " mlk-500 ".to_string(),
            name: "Fresh Milk 500ml".to_string(),
            description: String::new(),
            category: Category::Beverages,
            price: 6_500,
            cost: 5_000,
            supplier_id: None,
            reorder_level: 10,
            reorder_quantity: 0,
            occurred_at: test_time(),
        }
    }

    #[test]
    fn sku_normalization_ignores_case_and_padding() {
        assert_eq!(normalize_sku(" cola-330 "), "COLA-330");
        assert_eq!(normalize_sku("Cola-330"), normalize_sku("COLA-330"));
    }

    fn created() -> Product {
        let product_id = ProductId::generate();
        let mut product = Product::empty(product_id);
        let events = product
            .handle(&ProductCommand::CreateProduct(create_cmd(product_id)))
            .unwrap();
        for e in &events {
            product.apply(e);
        }
        product
    }

    #[test]
    fn create_product_normalises_sku_and_is_sellable() {
        let product = created();
        assert_eq!(product.sku(), "MLK-500");
        assert!(product.can_be_sold());
        assert_eq!(product.margin(), 1_500);
        assert_eq!(product.version(), 1);
    }

    #[test]
    fn create_product_rejects_empty_sku_and_zero_price() {
        let product_id = ProductId::generate();
        let product = Product::empty(product_id);

        let mut cmd = create_cmd(product_id);
        cmd.sku = "  ".to_string();
        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut cmd = create_cmd(product_id);
        cmd.price = 0;
        let err = product.handle(&ProductCommand::CreateProduct(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_negative_reorder_level() {
        let product_id = ProductId::generate();
        let mut cmd = create_cmd(product_id);
        cmd.reorder_level = -1;
        let err = Product::empty(product_id)
            .handle(&ProductCommand::CreateProduct(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_duplicate_creation() {
        let product = created();
        let err = product
            .handle(&ProductCommand::CreateProduct(create_cmd(product.id_typed())))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let mut product = created();
        let supplier_id = SupplierId::generate();
        let events = product
            .handle(&ProductCommand::UpdateProduct(UpdateProduct {
                price: Some(7_000),
                supplier_id: Some(Some(supplier_id)),
                ..UpdateProduct::default()
            }))
            .unwrap();
        product.apply(&events[0]);

        assert_eq!(product.price(), 7_000);
        assert_eq!(product.cost(), 5_000);
        assert_eq!(product.name(), "Fresh Milk 500ml");
        assert_eq!(product.supplier_id(), Some(supplier_id));
    }

    #[test]
    fn no_op_update_emits_nothing() {
        let product = created();
        let events = product
            .handle(&ProductCommand::UpdateProduct(UpdateProduct {
                price: Some(product.price()),
                ..UpdateProduct::default()
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn archived_product_cannot_be_updated_or_sold() {
        let mut product = created();
        let product_id = product.id_typed();
        let events = product
            .handle(&ProductCommand::ArchiveProduct(ArchiveProduct {
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap();
        product.apply(&events[0]);
        assert!(!product.can_be_sold());

        let err = product
            .handle(&ProductCommand::UpdateProduct(UpdateProduct {
                name: Some("New".to_string()),
                ..UpdateProduct::default()
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = product
            .handle(&ProductCommand::ArchiveProduct(ArchiveProduct {
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn archive_rejects_non_existent_product() {
        let product_id = ProductId::generate();
        let err = Product::empty(product_id)
            .handle(&ProductCommand::ArchiveProduct(ArchiveProduct {
                product_id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn reorder_policy_is_applied() {
        let mut product = created();
        let events = product
            .handle(&ProductCommand::SetReorderPolicy(SetReorderPolicy {
                product_id: product.id_typed(),
                reorder_level: 5,
                reorder_quantity: 24,
                occurred_at: test_time(),
            }))
            .unwrap();
        product.apply(&events[0]);
        assert_eq!(product.reorder_level(), 5);
        assert_eq!(product.reorder_quantity(), 24);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

            /// Handle never mutates state and is repeatable.
            #[test]
            fn handle_is_deterministic(price in 1u64..1_000_000, cost in 0u64..1_000_000) {
                let product = created();
                let before = product.clone();
                let cmd = ProductCommand::UpdateProduct(UpdateProduct {
                    price: Some(price),
                    cost: Some(cost),
                    occurred_at: Utc::now(),
                    ..UpdateProduct::default()
                });

                let first = product.handle(&cmd);
                let second = product.handle(&cmd);
                prop_assert_eq!(&before, &product);
                prop_assert_eq!(first, second);
            }

            /// Margin never underflows.
            #[test]
            fn margin_is_saturating(price in 1u64..1_000_000, cost in 0u64..2_000_000) {
                let mut product = created();
                let events = product
                    .handle(&ProductCommand::UpdateProduct(UpdateProduct {
                        price: Some(price),
                        cost: Some(cost),
                        ..UpdateProduct::default()
                    }))
                    .unwrap();
                for e in &events {
                    product.apply(e);
                }
                prop_assert_eq!(product.margin(), price.saturating_sub(cost));
            }
        }
    }
}
