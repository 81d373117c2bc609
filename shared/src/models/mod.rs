//! Data models
//!
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes, all timestamps Unix millis.

pub mod customer;
pub mod ledger;
pub mod merchant;
pub mod reward;
pub mod tier;
pub mod transaction;

// Re-exports
pub use customer::*;
pub use ledger::*;
pub use merchant::*;
pub use reward::*;
pub use tier::*;
pub use transaction::*;
