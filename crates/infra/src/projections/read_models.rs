use std::sync::Arc;

use invenhub_auth::UserId;
use invenhub_products::ProductId;
use invenhub_purchasing::PurchaseOrderId;
use invenhub_sales::SaleId;
use invenhub_suppliers::SupplierId;

use super::{
    ProductCatalogProjection, ProductReadModel, Projection, ProjectionBus, PurchaseOrderReadModel,
    PurchaseOrdersProjection, SaleReadModel, SalesProjection, StockLevel, StockLevelsProjection,
    SupplierReadModel, SuppliersProjection, UserReadModel, UsersProjection,
};
use crate::alerts::StockAlertsProjection;
use crate::read_model::InMemoryReadStore;

pub type Products = ProductCatalogProjection<InMemoryReadStore<ProductId, ProductReadModel>>;
pub type StockLevels = StockLevelsProjection<InMemoryReadStore<ProductId, StockLevel>>;
pub type Suppliers = SuppliersProjection<InMemoryReadStore<SupplierId, SupplierReadModel>>;
pub type Sales = SalesProjection<InMemoryReadStore<SaleId, SaleReadModel>>;
pub type PurchaseOrders = PurchaseOrdersProjection<InMemoryReadStore<PurchaseOrderId, PurchaseOrderReadModel>>;
pub type Users = UsersProjection<InMemoryReadStore<UserId, UserReadModel>>;

/// Every read model the service queries, backed by in-memory stores.
#[derive(Debug, Clone)]
pub struct ReadModels {
    pub products: Arc<Products>,
    pub stock: Arc<StockLevels>,
    pub suppliers: Arc<Suppliers>,
    pub sales: Arc<Sales>,
    pub purchase_orders: Arc<PurchaseOrders>,
    pub users: Arc<Users>,
    pub alerts: Arc<StockAlertsProjection>,
}

impl Default for ReadModels {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadModels {
    pub fn new() -> Self {
        Self {
            products: Arc::new(ProductCatalogProjection::new(InMemoryReadStore::new())),
            stock: Arc::new(StockLevelsProjection::new(InMemoryReadStore::new())),
            suppliers: Arc::new(SuppliersProjection::new(InMemoryReadStore::new())),
            sales: Arc::new(SalesProjection::new(InMemoryReadStore::new())),
            purchase_orders: Arc::new(PurchaseOrdersProjection::new(InMemoryReadStore::new())),
            users: Arc::new(UsersProjection::new(InMemoryReadStore::new())),
            alerts: Arc::new(StockAlertsProjection::new()),
        }
    }

    /// Projection bus feeding all of these read models.
    pub fn bus(&self) -> ProjectionBus {
        let projections: Vec<Arc<dyn Projection>> = vec![
            self.products.clone(),
            self.stock.clone(),
            self.suppliers.clone(),
            self.sales.clone(),
            self.purchase_orders.clone(),
            self.users.clone(),
            self.alerts.clone(),
        ];
        ProjectionBus::new(projections)
    }
}
