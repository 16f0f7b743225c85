//! HTTP request handlers
//!
//! Handlers stay thin: extract, check the capability, call the service,
//! wrap the result in the response envelope.

pub mod auth;
pub mod health;
pub mod inventory;
pub mod products;
pub mod sales;

pub use health::health_check;
