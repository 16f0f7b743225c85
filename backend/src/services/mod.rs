//! Business logic services
//!
//! Handlers stay thin; everything that touches the database lives here.
//! All stock mutations funnel through [`stock_ledger::apply_delta`].

pub mod auth;
pub mod catalog;
pub mod inventory;
pub mod sales;
pub mod stock_ledger;

pub use auth::AuthService;
pub use catalog::ProductService;
pub use inventory::InventoryService;
pub use sales::SalesService;
