//! Customer Benefit Repository
//!
//! Keyed by `(customer_id, tier_id, benefit_name)`; a row is never recreated.

use super::RepoResult;
use shared::models::CustomerBenefit;
use sqlx::{SqliteConnection, SqlitePool};

const BENEFIT_SELECT: &str = "SELECT id, customer_id, tier_id, benefit_name, status, unlocked_at, used_at FROM customer_benefit";

/// Insert an `available` benefit unless the triple already exists.
///
/// Returns whether a row was created.
pub async fn insert_available_if_missing(
    conn: &mut SqliteConnection,
    customer_id: i64,
    tier_id: i64,
    benefit_name: &str,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "INSERT INTO customer_benefit (customer_id, tier_id, benefit_name, status, unlocked_at) VALUES (?1, ?2, ?3, 'available', ?4) \
         ON CONFLICT (customer_id, tier_id, benefit_name) DO NOTHING",
    )
    .bind(customer_id)
    .bind(tier_id)
    .bind(benefit_name)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Insert a benefit directly in `used` state unless the triple already exists.
///
/// Returns whether a row was created.
pub async fn insert_used_if_missing(
    conn: &mut SqliteConnection,
    customer_id: i64,
    tier_id: i64,
    benefit_name: &str,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "INSERT INTO customer_benefit (customer_id, tier_id, benefit_name, status, unlocked_at, used_at) VALUES (?1, ?2, ?3, 'used', ?4, ?4) \
         ON CONFLICT (customer_id, tier_id, benefit_name) DO NOTHING",
    )
    .bind(customer_id)
    .bind(tier_id)
    .bind(benefit_name)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find(
    conn: &mut SqliteConnection,
    customer_id: i64,
    tier_id: i64,
    benefit_name: &str,
) -> RepoResult<Option<CustomerBenefit>> {
    let sql = format!("{BENEFIT_SELECT} WHERE customer_id = ? AND tier_id = ? AND benefit_name = ?");
    let row = sqlx::query_as::<_, CustomerBenefit>(&sql)
        .bind(customer_id)
        .bind(tier_id)
        .bind(benefit_name)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// `available → used`. Returns whether this call won.
pub async fn mark_used_if_available(
    conn: &mut SqliteConnection,
    id: i64,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE customer_benefit SET status = 'used', used_at = ?1 WHERE id = ?2 AND status = 'available'",
    )
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn list_by_customer(
    pool: &SqlitePool,
    customer_id: i64,
) -> RepoResult<Vec<CustomerBenefit>> {
    let sql = format!("{BENEFIT_SELECT} WHERE customer_id = ? ORDER BY unlocked_at ASC, id ASC");
    let rows = sqlx::query_as::<_, CustomerBenefit>(&sql)
        .bind(customer_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
