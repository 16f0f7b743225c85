//! Authentication and authorization tests
//!
//! Property-based and unit tests for:
//! - Username and password validation rules
//! - Role capability enforcement
//! - The single-admin account invariant

use proptest::prelude::*;

use shared::validation::{validate_password, validate_username};

// ============================================================================
// Role capability model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Admin,
    Manager,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    ManageUsers,
    ManageProducts,
    DeleteProducts,
    AdjustInventory,
    ManageAlerts,
    CancelSales,
    CreateSale,
    ViewCatalog,
}

/// Mirror of the capability table the handlers consult
fn is_allowed(role: Role, operation: Operation) -> bool {
    match operation {
        // Any authenticated user
        Operation::CreateSale | Operation::ViewCatalog => true,
        // Admin only
        Operation::DeleteProducts => role == Role::Admin,
        // Admin and manager
        Operation::ManageUsers
        | Operation::ManageProducts
        | Operation::AdjustInventory
        | Operation::ManageAlerts
        | Operation::CancelSales => matches!(role, Role::Admin | Role::Manager),
    }
}

// ============================================================================
// User store model for the single-admin invariant
// ============================================================================

#[derive(Debug, Default)]
struct UserStoreModel {
    users: Vec<(String, Role)>,
}

impl UserStoreModel {
    fn create(&mut self, username: &str, role: Role) -> Result<(), &'static str> {
        if self.users.iter().any(|(name, _)| name == username) {
            return Err("username taken");
        }
        if role == Role::Admin && self.users.iter().any(|(_, r)| *r == Role::Admin) {
            return Err("admin exists");
        }
        self.users.push((username.to_string(), role));
        Ok(())
    }

    fn admin_count(&self) -> usize {
        self.users.iter().filter(|(_, r)| *r == Role::Admin).count()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_staff_is_point_of_sale_only() {
    assert!(is_allowed(Role::Staff, Operation::CreateSale));
    assert!(is_allowed(Role::Staff, Operation::ViewCatalog));
    assert!(!is_allowed(Role::Staff, Operation::CancelSales));
    assert!(!is_allowed(Role::Staff, Operation::ManageUsers));
    assert!(!is_allowed(Role::Staff, Operation::AdjustInventory));
}

#[test]
fn test_manager_cannot_delete_products() {
    assert!(is_allowed(Role::Manager, Operation::ManageProducts));
    assert!(!is_allowed(Role::Manager, Operation::DeleteProducts));
    assert!(is_allowed(Role::Admin, Operation::DeleteProducts));
}

#[test]
fn test_second_admin_rejected() {
    let mut store = UserStoreModel::default();
    assert!(store.create("boss", Role::Admin).is_ok());
    assert_eq!(store.create("boss2", Role::Admin), Err("admin exists"));
    assert_eq!(store.admin_count(), 1);
}

#[test]
fn test_duplicate_username_rejected() {
    let mut store = UserStoreModel::default();
    store.create("zhang_wei", Role::Staff).unwrap();
    assert_eq!(store.create("zhang_wei", Role::Manager), Err("username taken"));
}

#[test]
fn test_username_rules() {
    assert!(validate_username("cashier01").is_ok());
    assert!(validate_username("li_na").is_ok());
    assert!(validate_username("ab").is_err());
    assert!(validate_username("name with space").is_err());
    assert!(validate_username("收银员").is_err());
}

#[test]
fn test_password_minimum_length() {
    assert!(validate_password("secret1").is_ok());
    assert!(validate_password("12345").is_err());
}

// ============================================================================
// Property Tests
// ============================================================================

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Manager), Just(Role::Staff)]
}

proptest! {
    /// Valid usernames are always accepted
    #[test]
    fn prop_wellformed_usernames_accepted(name in "[a-zA-Z0-9_]{3,30}") {
        prop_assert!(validate_username(&name).is_ok());
    }

    /// Anything an operation allows staff to do, it allows every role to do
    #[test]
    fn prop_privileges_are_monotonic(op in prop_oneof![
        Just(Operation::ManageUsers),
        Just(Operation::ManageProducts),
        Just(Operation::DeleteProducts),
        Just(Operation::AdjustInventory),
        Just(Operation::ManageAlerts),
        Just(Operation::CancelSales),
        Just(Operation::CreateSale),
        Just(Operation::ViewCatalog),
    ]) {
        if is_allowed(Role::Staff, op) {
            prop_assert!(is_allowed(Role::Manager, op));
            prop_assert!(is_allowed(Role::Admin, op));
        }
        if is_allowed(Role::Manager, op) {
            prop_assert!(is_allowed(Role::Admin, op));
        }
    }

    /// At most one admin ever exists, whatever the creation order
    #[test]
    fn prop_single_admin_invariant(
        attempts in prop::collection::vec(
            ("[a-z]{3,10}", role_strategy()),
            1..50
        )
    ) {
        let mut store = UserStoreModel::default();
        for (username, role) in attempts {
            let _ = store.create(&username, role);
            prop_assert!(store.admin_count() <= 1);
        }
    }
}
