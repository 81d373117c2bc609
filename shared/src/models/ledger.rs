//! Ledger event inputs and outcomes
//!
//! The request layer builds the events; the engine returns the outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::reward::{AvailableReward, RewardUnlock};

/// Stamps earned by a scan or purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampEvent {
    pub stamps: i32,
    pub description: Option<String>,
}

/// Purchase in a points program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub amount_ex_tax: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub points_multiplier: Decimal,
    pub description: Option<String>,
}

/// Result of a stamp event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampEventOutcome {
    pub stamps: i32,
    pub card_cycle_number: i32,
    pub display_stamps: i32,
    pub total_stamps: i64,
    pub card_was_reset: bool,
    pub cycles_completed: i32,
    /// Rewards claimable on the current card
    pub available_rewards: Vec<AvailableReward>,
    /// Instances moved to available by this event, any cycle
    pub newly_unlocked: Vec<RewardUnlock>,
}

/// Tier change applied by a purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierUpgrade {
    pub old_tier: Option<String>,
    pub new_tier: String,
    pub unlocked_benefits: Vec<String>,
}

/// Result of a purchase event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub points: i64,
    pub points_earned: i64,
    pub tier_upgrade: Option<TierUpgrade>,
}

/// Result of an expiration sweep
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepOutcome {
    pub expired_count: u64,
}

/// Current card position for display (recomputed, never stored)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSummary {
    pub customer_id: i64,
    pub stamps: i32,
    pub card_cycle_number: i32,
    pub stamps_required: i32,
    pub display_stamps: i32,
    pub total_stamps: i64,
    pub available_rewards: Vec<AvailableReward>,
}

/// Result of re-deriving reward instances from stored balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub instances_created: u64,
    pub newly_unlocked: Vec<RewardUnlock>,
    /// Sum of positive stamp entries in the ledger
    pub ledger_stamps: i64,
    /// `(cycle − 1) × N + stamps` from the customer row
    pub card_stamps: i64,
}

impl ReconcileOutcome {
    pub fn is_consistent(&self) -> bool {
        self.ledger_stamps == self.card_stamps
    }
}
