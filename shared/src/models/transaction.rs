//! Ledger Transaction Model

use serde::{Deserialize, Serialize};

/// Append-only ledger entry (流水)
///
/// `stamps_earned` is signed: negative values mark a redemption debit and do
/// not change the customer's card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: i64,
    pub customer_id: i64,
    pub merchant_id: i64,
    pub points: i64,
    pub stamps_earned: i32,
    pub description: Option<String>,
    pub amount: f64,
    pub tax_amount: f64,
    pub created_at: i64,
}

/// New ledger entry, built by the ledger writer constructors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCreate {
    pub customer_id: i64,
    pub merchant_id: i64,
    pub points: i64,
    pub stamps_earned: i32,
    pub description: Option<String>,
    pub amount: f64,
    pub tax_amount: f64,
}
