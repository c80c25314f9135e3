use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Valuation and unrealized PnL for a single held token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPnl {
    pub token: String,
    pub balance: Decimal,
    pub current_price: Decimal,
    pub value_usd: Decimal,
    pub entry_price: Option<Decimal>,
    pub entry_timestamp: Option<DateTime<Utc>>,
    pub unrealized_pnl: Decimal,
    pub pnl_percentage: Decimal,
    /// Share of total portfolio value, 0–100.
    pub allocation_percentage: Decimal,
}

/// Portfolio-wide PnL report. Tokens are sorted by value descending.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioPnl {
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub pnl_percentage: Decimal,
    pub tokens: Vec<TokenPnl>,
}
