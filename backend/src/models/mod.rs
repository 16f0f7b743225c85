//! Database-facing enums for the Retail Management Platform
//!
//! Re-exports the shared wire types and defines the Postgres enum mappings
//! used by the services. Row structs live next to the queries that produce
//! them, inside each service module.

pub use shared::types::{ApiResponse, PageData, Pagination, StockStatus};

use serde::{Deserialize, Serialize};

/// User roles, from most to least privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Staff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Staff => "staff",
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// Product lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    OutOfStock,
}

/// Kinds of stock mutation recorded in the inventory log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "change_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    In,
    Out,
    Adjust,
    Sale,
    Return,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::In => "in",
            ChangeType::Out => "out",
            ChangeType::Adjust => "adjust",
            ChangeType::Sale => "sale",
            ChangeType::Return => "return",
        }
    }
}

/// Sales order lifecycle
///
/// `pending` and `refunded` are modeled but reserved: orders are created
/// directly in `completed` and the only exposed transition is
/// `completed -> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

/// Threshold breach direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Low,
    High,
}
