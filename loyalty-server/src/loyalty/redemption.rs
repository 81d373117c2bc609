//! Redemption of reward instances and tier benefits
//!
//! Both paths run inside an event transaction that already holds the
//! customer claim. The final state change is still a conditional UPDATE, so
//! losing a race reads as `AlreadyRedeemed` rather than a double spend.

use sqlx::SqliteConnection;

use super::error::{LedgerError, LedgerResult};
use super::ledger;
use crate::db::repository::{customer_benefit, reward_instance};
use shared::error::ErrorCode;
use shared::models::{
    BenefitStatus, Customer, CustomerBenefit, MerchantConfig, RewardInstance, RewardStatus,
};

/// Why an instance that exists cannot be redeemed right now
fn unavailable(instance: &RewardInstance, now: i64) -> LedgerError {
    match instance.status {
        RewardStatus::Redeemed => LedgerError::AlreadyRedeemed {
            code: ErrorCode::RewardAlreadyRedeemed,
            message: format!(
                "reward {} for cycle {} already redeemed",
                instance.stamp_reward_id, instance.card_cycle_number
            ),
        },
        RewardStatus::Locked => LedgerError::NotApplicable {
            code: ErrorCode::RewardLocked,
            message: format!(
                "reward {} for cycle {} is still locked",
                instance.stamp_reward_id, instance.card_cycle_number
            ),
        },
        RewardStatus::Expired => expired(instance),
        RewardStatus::Available if instance.expires_at < now => expired(instance),
        RewardStatus::Available => LedgerError::AlreadyRedeemed {
            code: ErrorCode::RewardAlreadyRedeemed,
            message: format!(
                "reward {} for cycle {} was redeemed concurrently",
                instance.stamp_reward_id, instance.card_cycle_number
            ),
        },
    }
}

fn expired(instance: &RewardInstance) -> LedgerError {
    LedgerError::NotApplicable {
        code: ErrorCode::RewardExpired,
        message: format!(
            "reward {} for cycle {} expired",
            instance.stamp_reward_id, instance.card_cycle_number
        ),
    }
}

fn benefit_used(benefit_name: &str) -> LedgerError {
    LedgerError::AlreadyRedeemed {
        code: ErrorCode::BenefitAlreadyUsed,
        message: format!("benefit '{benefit_name}' already used"),
    }
}

/// Redeem the reward instance `(customer, stamp_reward_id, card_cycle_number)`.
pub async fn redeem_reward(
    conn: &mut SqliteConnection,
    config: &MerchantConfig,
    customer: &Customer,
    stamp_reward_id: i64,
    card_cycle_number: i32,
    now: i64,
) -> LedgerResult<RewardInstance> {
    if !config.is_stamp_program() {
        return Err(LedgerError::not_applicable(format!(
            "merchant {} does not run a stamp program",
            config.merchant.id
        )));
    }

    let instance = reward_instance::find(&mut *conn, customer.id, stamp_reward_id, card_cycle_number)
        .await?
        .ok_or_else(|| LedgerError::reward_not_found(stamp_reward_id, card_cycle_number))?;

    if instance.status != RewardStatus::Available || instance.expires_at < now {
        return Err(unavailable(&instance, now));
    }

    if !reward_instance::redeem_if_available(&mut *conn, instance.id, now).await? {
        let current = reward_instance::find(&mut *conn, customer.id, stamp_reward_id, card_cycle_number)
            .await?
            .unwrap_or(instance);
        return Err(unavailable(&current, now));
    }

    let (reward_name, stamps_required) = config
        .reward(stamp_reward_id)
        .map(|r| (r.reward_name.as_str(), r.stamps_required))
        .unwrap_or(("reward", 0));
    ledger::record(
        &mut *conn,
        ledger::redemption_entry(
            config.merchant.id,
            customer.id,
            reward_name,
            stamps_required,
            card_cycle_number,
        ),
        now,
    )
    .await?;

    reward_instance::find(&mut *conn, customer.id, stamp_reward_id, card_cycle_number)
        .await?
        .ok_or_else(|| LedgerError::reward_not_found(stamp_reward_id, card_cycle_number))
}

/// Use a tier benefit, creating the row directly as `used` if it was never
/// unlocked into the table.
pub async fn redeem_benefit(
    conn: &mut SqliteConnection,
    config: &MerchantConfig,
    customer: &Customer,
    tier_id: i64,
    benefit_name: &str,
    now: i64,
) -> LedgerResult<CustomerBenefit> {
    if !config.is_points_program() {
        return Err(LedgerError::not_applicable(format!(
            "merchant {} does not run a points program",
            config.merchant.id
        )));
    }

    let tier = config
        .tier(tier_id)
        .ok_or_else(|| LedgerError::tier_not_found(tier_id))?;
    let benefit_name = benefit_name.trim();
    if !tier.benefits.iter().any(|b| b == benefit_name) {
        return Err(LedgerError::benefit_not_found(&tier.name, benefit_name));
    }

    let consumed = match customer_benefit::find(&mut *conn, customer.id, tier_id, benefit_name).await? {
        Some(existing) if existing.status == BenefitStatus::Used => false,
        Some(existing) => customer_benefit::mark_used_if_available(&mut *conn, existing.id, now).await?,
        None => {
            customer_benefit::insert_used_if_missing(&mut *conn, customer.id, tier_id, benefit_name, now)
                .await?
        }
    };
    if !consumed {
        return Err(benefit_used(benefit_name));
    }

    ledger::record(
        &mut *conn,
        ledger::benefit_use_entry(config.merchant.id, customer.id, &tier.name, benefit_name),
        now,
    )
    .await?;

    customer_benefit::find(&mut *conn, customer.id, tier_id, benefit_name)
        .await?
        .ok_or_else(|| LedgerError::benefit_not_found(&tier.name, benefit_name))
}
