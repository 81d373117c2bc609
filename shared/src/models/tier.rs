//! Tier & Customer Benefit Models

use serde::{Deserialize, Serialize};

/// Tier entity (会员等级)
///
/// `benefits` is the typed list of benefit names, parsed once when the
/// merchant configuration is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub id: i64,
    pub merchant_id: i64,
    pub name: String,
    pub sort_order: i32,
    pub points_required: i64,
    pub benefits: Vec<String>,
    pub color: Option<String>,
    pub created_at: i64,
}

/// Tier row as stored (benefits kept as raw text)
#[derive(Debug, Clone)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TierRow {
    pub id: i64,
    pub merchant_id: i64,
    pub name: String,
    pub sort_order: i32,
    pub points_required: i64,
    pub benefits: String,
    pub color: Option<String>,
    pub created_at: i64,
}

impl From<TierRow> for Tier {
    fn from(row: TierRow) -> Self {
        Self {
            benefits: parse_benefit_list(&row.benefits),
            id: row.id,
            merchant_id: row.merchant_id,
            name: row.name,
            sort_order: row.sort_order,
            points_required: row.points_required,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

/// Create tier payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierCreate {
    pub name: String,
    pub sort_order: Option<i32>,
    pub points_required: i64,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub color: Option<String>,
}

/// Benefit lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum BenefitStatus {
    Available,
    Used,
}

/// Benefit unlocked by a tier for one customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CustomerBenefit {
    pub id: i64,
    pub customer_id: i64,
    pub tier_id: i64,
    pub benefit_name: String,
    pub status: BenefitStatus,
    pub unlocked_at: i64,
    pub used_at: Option<i64>,
}

/// Parse a stored benefit list into names.
///
/// Accepts a JSON string array (current format) or legacy free text
/// separated by commas/newlines. Blank entries and duplicates are dropped,
/// first occurrence wins.
pub fn parse_benefit_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let names: Vec<String> = if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed benefit list JSON, falling back to text split");
                split_benefit_text(trimmed.trim_start_matches('[').trim_end_matches(']'))
            }
        }
    } else {
        split_benefit_text(trimmed)
    };

    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim().trim_matches('"').trim().to_string();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn split_benefit_text(text: &str) -> Vec<String> {
    text.split([',', '\n'])
        .map(|s| s.to_string())
        .collect()
}

/// Serialize benefit names for storage
pub fn encode_benefit_list(benefits: &[String]) -> String {
    serde_json::to_string(benefits).unwrap_or_else(|_| "[]".to_string())
}
