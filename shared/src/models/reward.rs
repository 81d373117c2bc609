//! Stamp Reward & Reward Instance Models

use serde::{Deserialize, Serialize};

/// Stamp reward definition (集章奖励)
///
/// `stamps_required` is a milestone in cumulative stamps, not per card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StampReward {
    pub id: i64,
    pub merchant_id: i64,
    pub stamps_required: i32,
    pub reward_name: String,
    pub reward_description: Option<String>,
    pub created_at: i64,
}

/// Create stamp reward payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampRewardCreate {
    pub stamps_required: i32,
    pub reward_name: String,
    pub reward_description: Option<String>,
}

/// Reward instance lifecycle.
///
/// Only moves forward: `locked -> available -> {redeemed | expired}`, or
/// `locked -> expired`. `redeemed` and `expired` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum RewardStatus {
    Locked,
    Available,
    Redeemed,
    Expired,
}

impl RewardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardStatus::Locked => "locked",
            RewardStatus::Available => "available",
            RewardStatus::Redeemed => "redeemed",
            RewardStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RewardStatus::Redeemed | RewardStatus::Expired)
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle
    pub fn can_transition_to(&self, next: RewardStatus) -> bool {
        matches!(
            (self, next),
            (RewardStatus::Locked, RewardStatus::Available)
                | (RewardStatus::Locked, RewardStatus::Expired)
                | (RewardStatus::Available, RewardStatus::Redeemed)
                | (RewardStatus::Available, RewardStatus::Expired)
        )
    }
}

/// Per-cycle materialization of a reward definition for one customer.
///
/// Unique on `(customer_id, stamp_reward_id, card_cycle_number)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RewardInstance {
    pub id: i64,
    pub customer_id: i64,
    pub stamp_reward_id: i64,
    pub card_cycle_number: i32,
    pub status: RewardStatus,
    pub created_at: i64,
    pub unlocked_at: Option<i64>,
    pub redeemed_at: Option<i64>,
    pub expires_at: i64,
}

/// Legacy per-cycle redemption marker (read from the `redeemed_reward` view)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RedeemedReward {
    pub id: i64,
    pub customer_id: i64,
    pub stamp_reward_id: i64,
    pub card_cycle_number: i32,
    pub redeemed_at: i64,
}

/// Reward currently claimable, with its definition (for UI / notifications)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AvailableReward {
    pub stamp_reward_id: i64,
    pub card_cycle_number: i32,
    pub reward_name: String,
    pub reward_description: Option<String>,
    pub stamps_required: i32,
}

/// A reward instance moved from locked to available by an event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardUnlock {
    pub stamp_reward_id: i64,
    pub card_cycle_number: i32,
}
