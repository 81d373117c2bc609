//! Merchant & Program Configuration Models

use serde::{Deserialize, Serialize};

use super::reward::StampReward;
use super::tier::Tier;

/// Loyalty program variant run by a merchant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ProgramType {
    /// Purchases earn points, points unlock tiers
    Points,
    /// Scans earn stamps on a repeating card
    Stamps,
}

/// Merchant entity (商户)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Merchant {
    pub id: i64,
    pub name: String,
    pub program_type: ProgramType,
    /// Card size N for stamp programs
    pub stamps_required: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create merchant payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantCreate {
    pub name: String,
    pub program_type: ProgramType,
    pub stamps_required: Option<i32>,
}

/// Merchant with its tiers and stamp rewards, loaded once per event.
///
/// `tiers` are sorted by `points_required` ascending, `rewards` by
/// `stamps_required` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantConfig {
    #[serde(flatten)]
    pub merchant: Merchant,
    pub tiers: Vec<Tier>,
    pub rewards: Vec<StampReward>,
}

impl MerchantConfig {
    pub fn is_stamp_program(&self) -> bool {
        self.merchant.program_type == ProgramType::Stamps
    }

    pub fn is_points_program(&self) -> bool {
        self.merchant.program_type == ProgramType::Points
    }

    pub fn tier(&self, tier_id: i64) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.id == tier_id)
    }

    pub fn tier_by_name(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    pub fn reward(&self, stamp_reward_id: i64) -> Option<&StampReward> {
        self.rewards.iter().find(|r| r.id == stamp_reward_id)
    }
}
