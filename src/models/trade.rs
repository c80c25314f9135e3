use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for the trade_records table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRecord {
    pub id: i32,
    pub market: String,
    pub side: String,
    pub size: Decimal,
    pub price: Decimal,
    pub order_type: String,
    pub status: String,
    pub external_trade_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
