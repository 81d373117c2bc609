//! Ledger error taxonomy
//!
//! Business outcomes carry a stable [`ErrorCode`]; infrastructure failures
//! wrap [`RepoError`] and are the only retryable class.

use crate::db::repository::RepoError;
use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{message}")]
    NotFound { code: ErrorCode, message: String },

    #[error("customer {customer_id} does not belong to merchant {merchant_id}")]
    OwnershipMismatch { customer_id: i64, merchant_id: i64 },

    #[error("{message}")]
    AlreadyRedeemed { code: ErrorCode, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    NotApplicable { code: ErrorCode, message: String },

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl LedgerError {
    pub fn customer_not_found(customer_id: i64) -> Self {
        Self::NotFound {
            code: ErrorCode::CustomerNotFound,
            message: format!("customer {customer_id} not found"),
        }
    }

    pub fn merchant_not_found(merchant_id: i64) -> Self {
        Self::NotFound {
            code: ErrorCode::MerchantNotFound,
            message: format!("merchant {merchant_id} not found"),
        }
    }

    pub fn reward_not_found(stamp_reward_id: i64, card_cycle_number: i32) -> Self {
        Self::NotFound {
            code: ErrorCode::RewardNotFound,
            message: format!("reward {stamp_reward_id} has no instance for cycle {card_cycle_number}"),
        }
    }

    pub fn tier_not_found(tier_id: i64) -> Self {
        Self::NotFound {
            code: ErrorCode::TierNotFound,
            message: format!("tier {tier_id} not found"),
        }
    }

    pub fn benefit_not_found(tier_name: &str, benefit_name: &str) -> Self {
        Self::NotFound {
            code: ErrorCode::BenefitNotFound,
            message: format!("tier {tier_name} has no benefit '{benefit_name}'"),
        }
    }

    pub fn not_applicable(message: impl Into<String>) -> Self {
        Self::NotApplicable {
            code: ErrorCode::NotApplicable,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { code, .. }
            | Self::AlreadyRedeemed { code, .. }
            | Self::NotApplicable { code, .. } => *code,
            Self::OwnershipMismatch { .. } => ErrorCode::OwnershipMismatch,
            Self::InvalidInput(_) => ErrorCode::ValidationFailed,
            Self::Repo(e) if e.is_busy() => ErrorCode::SystemBusy,
            Self::Repo(RepoError::Validation(_)) => ErrorCode::ValidationFailed,
            Self::Repo(_) => ErrorCode::DatabaseError,
        }
    }

    /// Only infrastructure failures are worth retrying; every event is a
    /// single transaction, so a retry never double-credits.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Database(_)))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
