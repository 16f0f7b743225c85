//! Shared types for the Retail Management Platform
//!
//! This crate contains types shared between the backend and other
//! components of the system: the response envelope, pagination helpers,
//! derived stock status, and pure validation rules.

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::*;
