use core::str::FromStr;

use serde::{Deserialize, Serialize};

use invenhub_core::DomainError;

use crate::Permission;

/// Staff role used for RBAC.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }

    /// Permissions granted by this role.
    ///
    /// Admin holds the wildcard; manager holds everything but user management.
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            Role::Admin => vec![Permission::ALL],
            Role::Manager => Permission::catalog()
                .iter()
                .filter(|p| **p != Permission::USERS_MANAGE)
                .cloned()
                .collect(),
            Role::Cashier => vec![
                Permission::PRODUCTS_READ,
                Permission::SUPPLIERS_READ,
                Permission::SALES_READ,
                Permission::SALES_CREATE,
                Permission::NOTIFICATIONS_READ,
            ],
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
