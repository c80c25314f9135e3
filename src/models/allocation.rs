use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Database row for the allocation_targets table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AllocationTarget {
    pub id: i32,
    pub token_symbol: String,
    pub target_percentage: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One target entry as supplied by the caller of `set_targets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAllocation {
    pub symbol: String,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RebalanceAction {
    Reduce,
    Increase,
}

impl fmt::Display for RebalanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceAction::Reduce => write!(f, "REDUCE"),
            RebalanceAction::Increase => write!(f, "INCREASE"),
        }
    }
}

/// A target whose current allocation drifted past the rebalancing threshold.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationDeviation {
    pub symbol: String,
    pub current_percentage: Decimal,
    pub target_percentage: Decimal,
    /// current − target; positive means overweight.
    pub deviation: Decimal,
    pub action: RebalanceAction,
    pub suggestion: String,
}
