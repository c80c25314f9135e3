use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for the portfolio_positions table. One row per held token.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioPosition {
    pub id: i32,
    pub token_symbol: String,
    pub balance: Decimal,
    /// Volume-weighted average acquisition price in USD.
    pub entry_price: Option<Decimal>,
    /// Set on first acquisition, preserved across top-ups.
    pub entry_timestamp: Option<DateTime<Utc>>,
    /// Derived values, refreshed by the PnL calculator. Stale between refreshes.
    pub unrealized_pnl: Decimal,
    pub pnl_percentage: Decimal,
    pub updated_at: DateTime<Utc>,
}
