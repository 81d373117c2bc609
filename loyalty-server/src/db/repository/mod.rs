//! Repository Module
//!
//! Table-level SQL for the ledger store. Functions that take
//! `&mut SqliteConnection` are meant to run inside an event transaction
//! (`&mut *tx`); functions taking `&SqlitePool` are standalone reads/writes.

pub mod customer;
pub mod customer_benefit;
pub mod merchant;
pub mod reward_instance;
pub mod transaction;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RepoError {
    /// SQLite reported a lock timeout (SQLITE_BUSY / SQLITE_LOCKED)
    pub fn is_busy(&self) -> bool {
        match self {
            RepoError::Database(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("database is locked") || msg.contains("busy")
            }
            _ => false,
        }
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                RepoError::Validation(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
