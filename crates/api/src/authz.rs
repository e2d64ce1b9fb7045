//! API-side authorization guard.
//!
//! Handlers call [`require`] before touching services, keeping domain
//! aggregates and infra auth-agnostic.

use invenhub_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check that the caller holds `permission`.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(&principal.principal(), permission).inspect_err(|_| {
        tracing::debug!(
            user_id = %principal.user_id(),
            role = %principal.role(),
            permission = permission.as_str(),
            "permission denied"
        );
    })
}

#[cfg(test)]
mod tests {
    use invenhub_auth::{Role, UserId};

    use super::*;

    #[test]
    fn manager_cannot_manage_users() {
        let manager = PrincipalContext::new(UserId::generate(), "m@shop.test", Role::Manager);
        assert!(require(&manager, &Permission::PURCHASES_WRITE).is_ok());
        assert!(require(&manager, &Permission::USERS_MANAGE).is_err());
    }

    #[test]
    fn cashier_can_sell_but_not_void() {
        let cashier = PrincipalContext::new(UserId::generate(), "c@shop.test", Role::Cashier);
        assert!(require(&cashier, &Permission::SALES_CREATE).is_ok());
        assert!(require(&cashier, &Permission::SALES_VOID).is_err());
    }
}
