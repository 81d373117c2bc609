//! Shared types for the loyalty ledger
//!
//! Data models, error codes and small utilities used by the ledger engine
//! and by any caller that talks to it (request layer, scanners, dashboards).

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
