//! Reward Instance Repository
//!
//! One row per (customer, reward definition, card cycle). Every status write
//! is a conditional UPDATE guarded on the current status, so a transition
//! happens at most once no matter how many callers race for it.

use super::RepoResult;
use shared::models::{AvailableReward, RedeemedReward, RewardInstance};
use sqlx::{SqliteConnection, SqlitePool};

const INSTANCE_SELECT: &str = "SELECT id, customer_id, stamp_reward_id, card_cycle_number, status, created_at, unlocked_at, redeemed_at, expires_at FROM reward_instance";

/// Insert a `locked` instance for every reward definition of the merchant and
/// every cycle in `[from_cycle, to_cycle]`, skipping rows that already exist.
///
/// Returns the number of rows created.
pub async fn ensure_for_cycles(
    conn: &mut SqliteConnection,
    merchant_id: i64,
    customer_id: i64,
    from_cycle: i32,
    to_cycle: i32,
    now: i64,
    expires_at: i64,
) -> RepoResult<u64> {
    if from_cycle > to_cycle {
        return Ok(0);
    }
    let result = sqlx::query(
        "WITH RECURSIVE cycles(c) AS (SELECT ?1 UNION ALL SELECT c + 1 FROM cycles WHERE c < ?2) \
         INSERT INTO reward_instance (customer_id, stamp_reward_id, card_cycle_number, status, created_at, expires_at) \
         SELECT ?3, sr.id, cycles.c, 'locked', ?4, ?5 FROM stamp_reward sr, cycles WHERE sr.merchant_id = ?6 \
         ON CONFLICT (customer_id, stamp_reward_id, card_cycle_number) DO NOTHING",
    )
    .bind(from_cycle.max(1))
    .bind(to_cycle)
    .bind(customer_id)
    .bind(now)
    .bind(expires_at)
    .bind(merchant_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Move `locked` instances of one reward to `available` over a contiguous
/// cycle range. Instances already past `expires_at` are left alone.
///
/// Returns the cycles that were unlocked, ascending.
pub async fn unlock_range(
    conn: &mut SqliteConnection,
    customer_id: i64,
    stamp_reward_id: i64,
    from_cycle: i32,
    to_cycle: i32,
    now: i64,
) -> RepoResult<Vec<i32>> {
    let mut cycles: Vec<i32> = sqlx::query_scalar(
        "UPDATE reward_instance SET status = 'available', unlocked_at = ?1 \
         WHERE customer_id = ?2 AND stamp_reward_id = ?3 AND card_cycle_number BETWEEN ?4 AND ?5 \
         AND status = 'locked' AND expires_at >= ?1 \
         RETURNING card_cycle_number",
    )
    .bind(now)
    .bind(customer_id)
    .bind(stamp_reward_id)
    .bind(from_cycle)
    .bind(to_cycle)
    .fetch_all(conn)
    .await?;
    cycles.sort_unstable();
    Ok(cycles)
}

pub async fn find(
    conn: &mut SqliteConnection,
    customer_id: i64,
    stamp_reward_id: i64,
    card_cycle_number: i32,
) -> RepoResult<Option<RewardInstance>> {
    let sql = format!(
        "{INSTANCE_SELECT} WHERE customer_id = ? AND stamp_reward_id = ? AND card_cycle_number = ?"
    );
    let row = sqlx::query_as::<_, RewardInstance>(&sql)
        .bind(customer_id)
        .bind(stamp_reward_id)
        .bind(card_cycle_number)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// `available → redeemed`, only while unexpired. Returns whether this call won.
pub async fn redeem_if_available(
    conn: &mut SqliteConnection,
    id: i64,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE reward_instance SET status = 'redeemed', redeemed_at = ?1 WHERE id = ?2 AND status = 'available' AND expires_at >= ?1",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Rewards currently redeemable on the given card cycle
pub async fn find_available_for_cycle(
    conn: &mut SqliteConnection,
    customer_id: i64,
    card_cycle_number: i32,
) -> RepoResult<Vec<AvailableReward>> {
    let rows = sqlx::query_as::<_, AvailableReward>(
        "SELECT ri.stamp_reward_id, ri.card_cycle_number, sr.reward_name, sr.reward_description, sr.stamps_required \
         FROM reward_instance ri JOIN stamp_reward sr ON sr.id = ri.stamp_reward_id \
         WHERE ri.customer_id = ? AND ri.card_cycle_number = ? AND ri.status = 'available' \
         ORDER BY sr.stamps_required ASC, sr.id ASC",
    )
    .bind(customer_id)
    .bind(card_cycle_number)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn list_by_customer(
    pool: &SqlitePool,
    customer_id: i64,
) -> RepoResult<Vec<RewardInstance>> {
    let sql = format!(
        "{INSTANCE_SELECT} WHERE customer_id = ? ORDER BY card_cycle_number ASC, stamp_reward_id ASC"
    );
    let rows = sqlx::query_as::<_, RewardInstance>(&sql)
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Expire every non-terminal instance whose `expires_at` is before `now`.
///
/// Returns the number of transitions; a repeated call returns 0.
pub async fn sweep_expired(pool: &SqlitePool, now: i64) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE reward_instance SET status = 'expired' WHERE status IN ('locked', 'available') AND expires_at < ?",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Legacy per-cycle redemption markers (derived view)
pub async fn find_redeemed(pool: &SqlitePool, customer_id: i64) -> RepoResult<Vec<RedeemedReward>> {
    let rows = sqlx::query_as::<_, RedeemedReward>(
        "SELECT id, customer_id, stamp_reward_id, card_cycle_number, redeemed_at FROM redeemed_reward WHERE customer_id = ? ORDER BY redeemed_at ASC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
