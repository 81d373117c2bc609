//! Loyalty ledger engine
//!
//! - [`stamp_cycle`] - card arithmetic and multi-card rollover
//! - [`reward_unlock`] - retroactive unlock over cumulative stamps
//! - [`redemption`] - exactly-once reward / benefit redemption
//! - [`expiry`] - expiry dates and the periodic sweeper
//! - [`tier`] - points computation and sticky tier upgrades
//! - [`ledger`] - append-only transaction writer
//! - [`service`] - [`LoyaltyService`] facade, one transaction per event

pub mod error;
pub mod expiry;
pub mod ledger;
pub mod redemption;
pub mod reward_unlock;
pub mod service;
pub mod stamp_cycle;
pub mod tier;

pub use error::{LedgerError, LedgerResult};
pub use expiry::ExpirySweeper;
pub use service::LoyaltyService;
pub use stamp_cycle::MAX_STAMPS_PER_EVENT;
