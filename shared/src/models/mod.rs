//! Data models
//!
//! Shared between harvest-server and the storefront (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod chat;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use chat::*;
pub use order::*;
pub use product::*;
pub use user::*;
