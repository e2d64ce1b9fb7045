use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "products.read"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const ALL: Permission = Permission::from_static("*");

    pub const PRODUCTS_READ: Permission = Permission::from_static("products.read");
    pub const PRODUCTS_WRITE: Permission = Permission::from_static("products.write");
    pub const INVENTORY_ADJUST: Permission = Permission::from_static("inventory.adjust");
    pub const SUPPLIERS_READ: Permission = Permission::from_static("suppliers.read");
    pub const SUPPLIERS_WRITE: Permission = Permission::from_static("suppliers.write");
    pub const SALES_READ: Permission = Permission::from_static("sales.read");
    pub const SALES_CREATE: Permission = Permission::from_static("sales.create");
    pub const SALES_VOID: Permission = Permission::from_static("sales.void");
    pub const PURCHASES_READ: Permission = Permission::from_static("purchases.read");
    pub const PURCHASES_WRITE: Permission = Permission::from_static("purchases.write");
    pub const ANALYTICS_READ: Permission = Permission::from_static("analytics.read");
    pub const NOTIFICATIONS_READ: Permission = Permission::from_static("notifications.read");
    pub const USERS_MANAGE: Permission = Permission::from_static("users.manage");

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }

    /// Every concrete permission the service checks.
    pub fn catalog() -> &'static [Permission] {
        const CATALOG: &[Permission] = &[
            Permission::PRODUCTS_READ,
            Permission::PRODUCTS_WRITE,
            Permission::INVENTORY_ADJUST,
            Permission::SUPPLIERS_READ,
            Permission::SUPPLIERS_WRITE,
            Permission::SALES_READ,
            Permission::SALES_CREATE,
            Permission::SALES_VOID,
            Permission::PURCHASES_READ,
            Permission::PURCHASES_WRITE,
            Permission::ANALYTICS_READ,
            Permission::NOTIFICATIONS_READ,
            Permission::USERS_MANAGE,
        ];
        CATALOG
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
