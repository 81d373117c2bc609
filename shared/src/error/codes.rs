//! Unified error codes for the loyalty ledger
//!
//! Codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Customer / merchant errors
//! - 2xxx: Stamp reward errors
//! - 3xxx: Tier / benefit errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as a bare `u16` so every caller (dashboard, scanner, QR lookup)
/// sees the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed (non-positive deltas, missing fields)
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Operation does not apply to this program type
    NotApplicable = 9,

    // ==================== 1xxx: Customer ====================
    CustomerNotFound = 1001,
    MerchantNotFound = 1002,
    /// Customer belongs to a different merchant
    OwnershipMismatch = 1003,

    // ==================== 2xxx: Stamp Reward ====================
    RewardNotFound = 2001,
    RewardAlreadyRedeemed = 2002,
    /// Reward instance has not been unlocked yet
    RewardLocked = 2003,
    RewardExpired = 2004,

    // ==================== 3xxx: Tier ====================
    TierNotFound = 3001,
    BenefitNotFound = 3002,
    BenefitAlreadyUsed = 3003,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    ConfigError = 9005,
    /// Store is busy (lock timeout), retry later
    SystemBusy = 9404,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::NotApplicable => "Operation is not applicable to this loyalty program",

            // Customer
            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::MerchantNotFound => "Merchant not found",
            ErrorCode::OwnershipMismatch => "Customer does not belong to this merchant",

            // Reward
            ErrorCode::RewardNotFound => "Reward not found",
            ErrorCode::RewardAlreadyRedeemed => "Reward has already been redeemed",
            ErrorCode::RewardLocked => "Reward has not been unlocked yet",
            ErrorCode::RewardExpired => "Reward has expired",

            // Tier
            ErrorCode::TierNotFound => "Tier not found",
            ErrorCode::BenefitNotFound => "Benefit not found",
            ErrorCode::BenefitAlreadyUsed => "Benefit has already been used",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "System is busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown `u16` into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::NotApplicable),

            // Customer
            1001 => Ok(ErrorCode::CustomerNotFound),
            1002 => Ok(ErrorCode::MerchantNotFound),
            1003 => Ok(ErrorCode::OwnershipMismatch),

            // Reward
            2001 => Ok(ErrorCode::RewardNotFound),
            2002 => Ok(ErrorCode::RewardAlreadyRedeemed),
            2003 => Ok(ErrorCode::RewardLocked),
            2004 => Ok(ErrorCode::RewardExpired),

            // Tier
            3001 => Ok(ErrorCode::TierNotFound),
            3002 => Ok(ErrorCode::BenefitNotFound),
            3003 => Ok(ErrorCode::BenefitAlreadyUsed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
