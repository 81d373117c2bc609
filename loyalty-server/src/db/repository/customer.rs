//! Customer Repository
//!
//! Balance columns (`points`, `stamps`, `card_cycle_number`, `tier`) are only
//! written from inside an event transaction, after [`claim`].

use super::{RepoError, RepoResult};
use shared::models::{Customer, CustomerCreate};
use sqlx::{SqliteConnection, SqlitePool};

const CUSTOMER_SELECT: &str = "SELECT id, merchant_id, name, email, points, stamps, card_cycle_number, tier, last_tier_upgrade_at, created_at, updated_at FROM customer";

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<Customer>> {
    let sql = format!("{CUSTOMER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn find_by_merchant(pool: &SqlitePool, merchant_id: i64) -> RepoResult<Vec<Customer>> {
    let sql = format!("{CUSTOMER_SELECT} WHERE merchant_id = ? ORDER BY created_at DESC");
    let rows = sqlx::query_as::<_, Customer>(&sql)
        .bind(merchant_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Create a customer on an empty card (cycle 1).
///
/// The starting tier is the highest tier that qualifies at 0 points, if any.
/// No benefits are unlocked for it.
pub async fn create(pool: &SqlitePool, data: CustomerCreate) -> RepoResult<Customer> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(RepoError::Validation("customer name must not be empty".into()));
    }

    let mut tx = pool.begin().await?;

    let merchant_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM merchant WHERE id = ?")
        .bind(data.merchant_id)
        .fetch_optional(&mut *tx)
        .await?;
    if merchant_exists.is_none() {
        return Err(RepoError::NotFound(format!(
            "merchant {} not found",
            data.merchant_id
        )));
    }

    let entry_tier: Option<String> = sqlx::query_scalar(
        "SELECT name FROM tier WHERE merchant_id = ? AND points_required <= 0 ORDER BY points_required DESC, sort_order DESC LIMIT 1",
    )
    .bind(data.merchant_id)
    .fetch_optional(&mut *tx)
    .await?;

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO customer (id, merchant_id, name, email, points, stamps, card_cycle_number, tier, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, 0, 1, ?5, ?6, ?6)",
    )
    .bind(id)
    .bind(data.merchant_id)
    .bind(name)
    .bind(&data.email)
    .bind(&entry_tier)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let customer = find_by_id(&mut tx, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create customer".into()))?;
    tx.commit().await?;
    Ok(customer)
}

/// Take the write lock on a customer row.
///
/// Must be the first statement of an event transaction. Returns `false` when
/// the customer does not exist.
pub async fn claim(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let result = sqlx::query("UPDATE customer SET updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Persist the current card position
pub async fn update_card(
    conn: &mut SqliteConnection,
    id: i64,
    stamps: i32,
    card_cycle_number: i32,
    now: i64,
) -> RepoResult<()> {
    let result = sqlx::query(
        "UPDATE customer SET stamps = ?1, card_cycle_number = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(stamps)
    .bind(card_cycle_number)
    .bind(now)
    .bind(id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("customer {id} not found")));
    }
    Ok(())
}

/// Persist the points balance and, on upgrade, the new tier
pub async fn update_points_and_tier(
    conn: &mut SqliteConnection,
    id: i64,
    points: i64,
    tier_upgrade: Option<&str>,
    now: i64,
) -> RepoResult<()> {
    let result = match tier_upgrade {
        Some(tier) => {
            sqlx::query(
                "UPDATE customer SET points = ?1, tier = ?2, last_tier_upgrade_at = ?3, updated_at = ?3 WHERE id = ?4",
            )
            .bind(points)
            .bind(tier)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?
        }
        None => {
            sqlx::query("UPDATE customer SET points = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(points)
                .bind(now)
                .bind(id)
                .execute(conn)
                .await?
        }
    };
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("customer {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::merchant;
    use crate::db::test_support::test_db;
    use shared::models::{MerchantCreate, ProgramType, TierCreate};

    async fn seed_merchant(pool: &SqlitePool) -> i64 {
        let merchant = merchant::create(
            pool,
            MerchantCreate {
                name: "Corner Cafe".into(),
                program_type: ProgramType::Points,
                stamps_required: None,
            },
        )
        .await
        .unwrap();
        merchant.id
    }

    #[tokio::test]
    async fn test_create_assigns_entry_tier() {
        let (db, _dir) = test_db().await;
        let merchant_id = seed_merchant(&db.pool).await;
        for (name, points) in [("Bronze", 0), ("Silver", 100)] {
            merchant::create_tier(
                &db.pool,
                merchant_id,
                TierCreate {
                    name: name.into(),
                    sort_order: None,
                    points_required: points,
                    benefits: vec![],
                    color: None,
                },
            )
            .await
            .unwrap();
        }

        let customer = create(
            &db.pool,
            CustomerCreate {
                merchant_id,
                name: "Ada".into(),
                email: Some("ada@example.com".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(customer.tier.as_deref(), Some("Bronze"));
        assert_eq!(customer.points, 0);
        assert_eq!(customer.stamps, 0);
        assert_eq!(customer.card_cycle_number, 1);
        assert!(customer.last_tier_upgrade_at.is_none());
    }

    #[tokio::test]
    async fn test_create_requires_merchant() {
        let (db, _dir) = test_db().await;
        let err = create(
            &db.pool,
            CustomerCreate {
                merchant_id: 7,
                name: "Nobody".into(),
                email: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_claim_and_update_card() {
        let (db, _dir) = test_db().await;
        let merchant_id = seed_merchant(&db.pool).await;
        let customer = create(
            &db.pool,
            CustomerCreate {
                merchant_id,
                name: "Bo".into(),
                email: None,
            },
        )
        .await
        .unwrap();

        let mut tx = db.pool.begin().await.unwrap();
        assert!(claim(&mut tx, customer.id, 1).await.unwrap());
        assert!(!claim(&mut tx, customer.id + 1, 1).await.unwrap());
        update_card(&mut tx, customer.id, 3, 2, 2).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        let reloaded = find_by_id(&mut conn, customer.id).await.unwrap().unwrap();
        assert_eq!((reloaded.stamps, reloaded.card_cycle_number), (3, 2));
    }

    #[tokio::test]
    async fn test_negative_points_rejected_by_store() {
        let (db, _dir) = test_db().await;
        let merchant_id = seed_merchant(&db.pool).await;
        let customer = create(
            &db.pool,
            CustomerCreate {
                merchant_id,
                name: "Cy".into(),
                email: None,
            },
        )
        .await
        .unwrap();

        let mut conn = db.pool.acquire().await.unwrap();
        let err = update_points_and_tier(&mut conn, customer.id, -1, None, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}
