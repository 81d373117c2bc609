//! Merchant Repository
//!
//! Merchant program settings plus the tier and stamp-reward definitions that
//! make up a [`MerchantConfig`].

use super::{RepoError, RepoResult};
use shared::models::{
    Merchant, MerchantConfig, MerchantCreate, StampReward, StampRewardCreate, Tier, TierCreate,
    TierRow, encode_benefit_list,
};
use sqlx::{SqliteConnection, SqlitePool};

const DEFAULT_STAMPS_REQUIRED: i32 = 10;

const MERCHANT_SELECT: &str =
    "SELECT id, name, program_type, stamps_required, created_at, updated_at FROM merchant";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Merchant>> {
    let sql = format!("{MERCHANT_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Merchant>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: MerchantCreate) -> RepoResult<Merchant> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(RepoError::Validation("merchant name must not be empty".into()));
    }
    let stamps_required = data.stamps_required.unwrap_or(DEFAULT_STAMPS_REQUIRED);
    if stamps_required < 1 {
        return Err(RepoError::Validation(format!(
            "stamps_required must be >= 1, got {stamps_required}"
        )));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO merchant (id, name, program_type, stamps_required, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
    )
    .bind(id)
    .bind(name)
    .bind(data.program_type)
    .bind(stamps_required)
    .bind(now)
    .execute(pool)
    .await?;

    let mut conn = pool.acquire().await?;
    find_by_id(&mut conn, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create merchant".into()))
}

pub async fn create_tier(
    pool: &SqlitePool,
    merchant_id: i64,
    data: TierCreate,
) -> RepoResult<Tier> {
    if data.points_required < 0 {
        return Err(RepoError::Validation(format!(
            "points_required must be >= 0, got {}",
            data.points_required
        )));
    }
    let name = data.name.trim();
    if name.is_empty() {
        return Err(RepoError::Validation("tier name must not be empty".into()));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let row = sqlx::query_as::<_, TierRow>(
        "INSERT INTO tier (id, merchant_id, name, sort_order, points_required, benefits, color, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id, merchant_id, name, sort_order, points_required, benefits, color, created_at",
    )
    .bind(id)
    .bind(merchant_id)
    .bind(name)
    .bind(data.sort_order.unwrap_or(0))
    .bind(data.points_required)
    .bind(encode_benefit_list(&data.benefits))
    .bind(&data.color)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn create_stamp_reward(
    pool: &SqlitePool,
    merchant_id: i64,
    data: StampRewardCreate,
) -> RepoResult<StampReward> {
    if data.stamps_required < 1 {
        return Err(RepoError::Validation(format!(
            "stamps_required must be >= 1, got {}",
            data.stamps_required
        )));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let row = sqlx::query_as::<_, StampReward>(
        "INSERT INTO stamp_reward (id, merchant_id, stamps_required, reward_name, reward_description, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING id, merchant_id, stamps_required, reward_name, reward_description, created_at",
    )
    .bind(id)
    .bind(merchant_id)
    .bind(data.stamps_required)
    .bind(data.reward_name.trim())
    .bind(&data.reward_description)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Tiers ascending by threshold (rank ties broken by `sort_order`)
pub async fn find_tiers(conn: &mut SqliteConnection, merchant_id: i64) -> RepoResult<Vec<Tier>> {
    let rows = sqlx::query_as::<_, TierRow>(
        "SELECT id, merchant_id, name, sort_order, points_required, benefits, color, created_at FROM tier WHERE merchant_id = ? ORDER BY points_required ASC, sort_order ASC, id ASC",
    )
    .bind(merchant_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Tier::from).collect())
}

/// Reward definitions ascending by cumulative stamp milestone
pub async fn find_stamp_rewards(
    conn: &mut SqliteConnection,
    merchant_id: i64,
) -> RepoResult<Vec<StampReward>> {
    let rows = sqlx::query_as::<_, StampReward>(
        "SELECT id, merchant_id, stamps_required, reward_name, reward_description, created_at FROM stamp_reward WHERE merchant_id = ? ORDER BY stamps_required ASC, id ASC",
    )
    .bind(merchant_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Load the merchant with its tiers and reward definitions in one snapshot.
///
/// Benefit lists are parsed here, once, into typed names.
pub async fn load_config(
    conn: &mut SqliteConnection,
    merchant_id: i64,
) -> RepoResult<Option<MerchantConfig>> {
    let Some(merchant) = find_by_id(&mut *conn, merchant_id).await? else {
        return Ok(None);
    };
    let tiers = find_tiers(&mut *conn, merchant_id).await?;
    let rewards = find_stamp_rewards(&mut *conn, merchant_id).await?;
    Ok(Some(MerchantConfig {
        merchant,
        tiers,
        rewards,
    }))
}
