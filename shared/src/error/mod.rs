//! Error codes for the loyalty ledger
//!
//! - [`ErrorCode`]: stable numeric codes surfaced to callers
//! - [`ErrorCategory`]: classification of codes by domain
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Customer / merchant errors
//! - 2xxx: Stamp reward errors
//! - 3xxx: Tier / benefit errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{ErrorCategory, ErrorCode};
//!
//! let code = ErrorCode::RewardAlreadyRedeemed;
//! assert_eq!(code.code(), 2002);
//! assert_eq!(code.category(), ErrorCategory::Reward);
//! ```

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
