//! Application-level errors (startup, configuration, infrastructure)
//!
//! Ledger operations use [`crate::loyalty::LedgerError`]; this type covers
//! what happens around them: opening the store, reading config, I/O.

use shared::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::Config(_) => ErrorCode::ConfigError,
            AppError::Io(_) => ErrorCode::InternalError,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(AppError::Database("x".into()).code(), ErrorCode::DatabaseError);
        assert_eq!(AppError::Config("x".into()).code(), ErrorCode::ConfigError);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(AppError::from(io).code(), ErrorCode::InternalError);
    }
}
