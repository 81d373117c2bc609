//! Transaction ledger writer
//!
//! Every balance-affecting event appends exactly one immutable entry.

use rust_decimal::prelude::*;
use sqlx::SqliteConnection;

use super::error::LedgerResult;
use crate::db::repository::transaction;
use crate::utils::logger::LEDGER_TARGET;
use shared::models::{Transaction, TransactionCreate};

/// Decimal money to the stored `REAL` column
fn to_amount(value: Decimal) -> f64 {
    value.round_dp(2).to_f64().unwrap_or_default()
}

pub fn stamp_entry(
    merchant_id: i64,
    customer_id: i64,
    stamps: i32,
    description: Option<String>,
) -> TransactionCreate {
    TransactionCreate {
        customer_id,
        merchant_id,
        points: 0,
        stamps_earned: stamps,
        description,
        amount: 0.0,
        tax_amount: 0.0,
    }
}

pub fn purchase_entry(
    merchant_id: i64,
    customer_id: i64,
    points: i64,
    amount_ex_tax: Decimal,
    tax_amount: Decimal,
    description: Option<String>,
) -> TransactionCreate {
    TransactionCreate {
        customer_id,
        merchant_id,
        points,
        stamps_earned: 0,
        description,
        amount: to_amount(amount_ex_tax),
        tax_amount: to_amount(tax_amount),
    }
}

/// Bookkeeping debit for a redeemed reward; the card itself is untouched
pub fn redemption_entry(
    merchant_id: i64,
    customer_id: i64,
    reward_name: &str,
    stamps_required: i32,
    card_cycle_number: i32,
) -> TransactionCreate {
    TransactionCreate {
        customer_id,
        merchant_id,
        points: 0,
        stamps_earned: -stamps_required,
        description: Some(format!("Redeemed: {reward_name} (card {card_cycle_number})")),
        amount: 0.0,
        tax_amount: 0.0,
    }
}

pub fn benefit_use_entry(
    merchant_id: i64,
    customer_id: i64,
    tier_name: &str,
    benefit_name: &str,
) -> TransactionCreate {
    TransactionCreate {
        customer_id,
        merchant_id,
        points: 0,
        stamps_earned: 0,
        description: Some(format!("Benefit used: {benefit_name} ({tier_name})")),
        amount: 0.0,
        tax_amount: 0.0,
    }
}

pub async fn record(
    conn: &mut SqliteConnection,
    entry: TransactionCreate,
    now: i64,
) -> LedgerResult<Transaction> {
    let tx = transaction::append(conn, &entry, now).await?;
    tracing::info!(
        target: LEDGER_TARGET,
        transaction_id = tx.id,
        customer_id = tx.customer_id,
        merchant_id = tx.merchant_id,
        points = tx.points,
        stamps_earned = tx.stamps_earned,
        amount = tx.amount,
        "Ledger entry appended"
    );
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redemption_is_negative_debit() {
        let entry = redemption_entry(1, 2, "Free coffee", 8, 3);
        assert_eq!(entry.stamps_earned, -8);
        assert_eq!(entry.points, 0);
        assert_eq!(entry.description.as_deref(), Some("Redeemed: Free coffee (card 3)"));
    }

    #[test]
    fn test_purchase_amounts_rounded_to_cents() {
        let entry = purchase_entry(
            1,
            2,
            30,
            "30.004".parse().unwrap(),
            "2.1".parse().unwrap(),
            None,
        );
        assert_eq!(entry.amount, 30.0);
        assert_eq!(entry.tax_amount, 2.1);
        assert_eq!(entry.stamps_earned, 0);
    }

    #[test]
    fn test_benefit_use_is_zero_delta() {
        let entry = benefit_use_entry(1, 2, "Silver", "Free coffee");
        assert_eq!((entry.points, entry.stamps_earned), (0, 0));
    }
}
