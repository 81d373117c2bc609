//! Ledger Transaction Repository
//!
//! Append-only: the table rejects UPDATE and DELETE at the database level.

use super::RepoResult;
use shared::models::{Transaction, TransactionCreate};
use sqlx::{SqliteConnection, SqlitePool};

const TRANSACTION_COLUMNS: &str =
    "id, customer_id, merchant_id, points, stamps_earned, description, amount, tax_amount, created_at";

pub async fn append(
    conn: &mut SqliteConnection,
    entry: &TransactionCreate,
    now: i64,
) -> RepoResult<Transaction> {
    let sql = format!(
        "INSERT INTO ledger_transaction (customer_id, merchant_id, points, stamps_earned, description, amount, tax_amount, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {TRANSACTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Transaction>(&sql)
        .bind(entry.customer_id)
        .bind(entry.merchant_id)
        .bind(entry.points)
        .bind(entry.stamps_earned)
        .bind(&entry.description)
        .bind(entry.amount)
        .bind(entry.tax_amount)
        .bind(now)
        .fetch_one(conn)
        .await?;
    Ok(row)
}

/// Most recent entries first
pub async fn list_by_customer(
    pool: &SqlitePool,
    customer_id: i64,
    limit: i64,
) -> RepoResult<Vec<Transaction>> {
    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM ledger_transaction WHERE customer_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
    );
    let rows = sqlx::query_as::<_, Transaction>(&sql)
        .bind(customer_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Sum of every stamp credit (redemption debits excluded)
pub async fn sum_positive_stamps(conn: &mut SqliteConnection, customer_id: i64) -> RepoResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(stamps_earned), 0) FROM ledger_transaction WHERE customer_id = ? AND stamps_earned > 0",
    )
    .bind(customer_id)
    .fetch_one(conn)
    .await?;
    Ok(total)
}
