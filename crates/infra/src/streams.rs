//! Aggregate type names written to every stored event.

pub const PRODUCT: &str = "products.product";
pub const STOCK: &str = "inventory.stock";
pub const SUPPLIER: &str = "suppliers.supplier";
pub const SALE: &str = "sales.sale";
pub const PURCHASE_ORDER: &str = "purchasing.order";
pub const USER: &str = "auth.user";
