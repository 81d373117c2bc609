//! Tier engine (points programs)
//!
//! Tiers are sticky: a customer only ever moves up. An upgrade unlocks the
//! target tier's named benefits, each at most once per customer.

use rust_decimal::prelude::*;
use sqlx::SqliteConnection;

use super::error::{LedgerError, LedgerResult};
use crate::db::repository::customer_benefit;
use shared::models::{Tier, TierUpgrade};

/// Points for a purchase: `floor(amount_ex_tax × multiplier)`
pub fn compute_points(amount_ex_tax: Decimal, points_multiplier: Decimal) -> LedgerResult<i64> {
    if amount_ex_tax <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "amount_ex_tax must be > 0, got {amount_ex_tax}"
        )));
    }
    if points_multiplier <= Decimal::ZERO {
        return Err(LedgerError::InvalidInput(format!(
            "points_multiplier must be > 0, got {points_multiplier}"
        )));
    }
    amount_ex_tax
        .checked_mul(points_multiplier)
        .and_then(|p| p.floor().to_i64())
        .ok_or_else(|| LedgerError::InvalidInput("points value out of range".into()))
}

/// Highest tier whose threshold is met. `tiers` must be sorted ascending by
/// `points_required` (as loaded into `MerchantConfig`).
pub fn select_target_tier(tiers: &[Tier], points: i64) -> Option<&Tier> {
    tiers.iter().rev().find(|t| t.points_required <= points)
}

/// Position of a tier in the ascending ladder
fn rank(tiers: &[Tier], name: &str) -> Option<usize> {
    tiers.iter().position(|t| t.name == name)
}

/// Decide whether `points` moves the customer to a higher tier.
///
/// A current tier name no longer present in the ladder ranks below all tiers.
pub fn evaluate_upgrade<'a>(
    tiers: &'a [Tier],
    current_tier: Option<&str>,
    points: i64,
) -> Option<&'a Tier> {
    let target = select_target_tier(tiers, points)?;
    match current_tier {
        Some(current) if current == target.name => None,
        Some(current) => match rank(tiers, current) {
            Some(current_rank) if current_rank >= rank(tiers, &target.name)? => None,
            _ => Some(target),
        },
        None => Some(target),
    }
}

/// Unlock the target tier's benefits (insert-or-skip) and describe the upgrade
pub async fn apply_upgrade(
    conn: &mut SqliteConnection,
    customer_id: i64,
    old_tier: Option<String>,
    target: &Tier,
    now: i64,
) -> LedgerResult<TierUpgrade> {
    let mut unlocked_benefits = Vec::new();
    for benefit in &target.benefits {
        if customer_benefit::insert_available_if_missing(&mut *conn, customer_id, target.id, benefit, now)
            .await?
        {
            unlocked_benefits.push(benefit.clone());
        }
    }
    Ok(TierUpgrade {
        old_tier,
        new_tier: target.name.clone(),
        unlocked_benefits,
    })
}
