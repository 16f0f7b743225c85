//! Capability table mapping operations to the roles allowed to perform them
//!
//! Handlers call [`require`] with the authenticated user before touching a
//! service. Keeping the mapping in one table makes the whole permission
//! surface reviewable at a glance.

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::UserRole;

/// Operations that require a role beyond being authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageUsers,
    ManageProducts,
    DeleteProducts,
    AdjustInventory,
    ManageAlerts,
    CancelSales,
}

/// Roles permitted to exercise a capability
pub fn allowed_roles(capability: Capability) -> &'static [UserRole] {
    match capability {
        Capability::ManageUsers => &[UserRole::Admin, UserRole::Manager],
        Capability::ManageProducts => &[UserRole::Admin, UserRole::Manager],
        Capability::DeleteProducts => &[UserRole::Admin],
        Capability::AdjustInventory => &[UserRole::Admin, UserRole::Manager],
        Capability::ManageAlerts => &[UserRole::Admin, UserRole::Manager],
        Capability::CancelSales => &[UserRole::Admin, UserRole::Manager],
    }
}

/// Reject the request unless the user's role carries the capability
pub fn require(user: &AuthUser, capability: Capability) -> AppResult<()> {
    if allowed_roles(capability).contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "test_user".to_string(),
            real_name: "测试用户".to_string(),
            role,
        }
    }

    #[test]
    fn test_staff_cannot_manage() {
        let staff = user(UserRole::Staff);
        assert!(require(&staff, Capability::ManageUsers).is_err());
        assert!(require(&staff, Capability::AdjustInventory).is_err());
        assert!(require(&staff, Capability::CancelSales).is_err());
    }

    #[test]
    fn test_manager_scope() {
        let manager = user(UserRole::Manager);
        assert!(require(&manager, Capability::ManageProducts).is_ok());
        assert!(require(&manager, Capability::ManageAlerts).is_ok());
        // Product deletion is admin-only
        assert!(require(&manager, Capability::DeleteProducts).is_err());
    }

    #[test]
    fn test_admin_has_everything() {
        let admin = user(UserRole::Admin);
        for capability in [
            Capability::ManageUsers,
            Capability::ManageProducts,
            Capability::DeleteProducts,
            Capability::AdjustInventory,
            Capability::ManageAlerts,
            Capability::CancelSales,
        ] {
            assert!(require(&admin, capability).is_ok());
        }
    }
}
