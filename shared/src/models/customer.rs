//! Customer Model

use serde::{Deserialize, Serialize};

/// Customer entity (顾客)
///
/// `stamps` counts stamps on the current card only; lifetime totals are
/// derived through [`StampCard`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub merchant_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub points: i64,
    pub stamps: i32,
    pub card_cycle_number: i32,
    pub tier: Option<String>,
    pub last_tier_upgrade_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Customer {
    pub fn stamp_card(&self, stamps_required: i32) -> StampCard {
        StampCard {
            stamps: self.stamps,
            card_cycle_number: self.card_cycle_number,
            stamps_required,
        }
    }
}

/// Create customer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerCreate {
    pub merchant_id: i64,
    pub name: String,
    pub email: Option<String>,
}

/// Current stamp card of a customer.
///
/// Display and lifetime values are always recomputed from
/// `(stamps, card_cycle_number)`, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StampCard {
    pub stamps: i32,
    pub card_cycle_number: i32,
    pub stamps_required: i32,
}

impl StampCard {
    /// Stamps shown on the card: a full, not yet rolled card shows N/N.
    pub fn display_stamps(&self) -> i32 {
        if self.stamps_required <= 0 {
            return self.stamps;
        }
        if self.stamps == self.stamps_required {
            self.stamps_required
        } else {
            self.stamps % self.stamps_required
        }
    }

    /// Lifetime stamps: `(cycle - 1) * N + stamps`
    pub fn total_stamps(&self) -> i64 {
        (self.card_cycle_number as i64 - 1) * self.stamps_required as i64 + self.stamps as i64
    }

    pub fn is_full(&self) -> bool {
        self.stamps >= self.stamps_required
    }
}
