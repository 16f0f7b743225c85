//! Request middleware: authentication, authorization and operation logging

pub mod auth;
pub mod capability;
pub mod oplog;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
pub use capability::Capability;
pub use oplog::oplog_middleware;
