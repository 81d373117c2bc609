//! Utilities - error type and logging setup
//!
//! - [`AppError`] - startup / infrastructure errors
//! - [`logger`] - tracing subscriber setup

pub mod error;
pub mod logger;

pub use error::{AppError, AppResult};
