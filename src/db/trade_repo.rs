use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::models::{Side, TradeRecord};

/// History is capped: the most recent N rows survive, older rows are pruned
/// on every insert.
const HISTORY_KEEP: i64 = 5;

/// Append a trade record and prune history, inside the caller's transaction.
pub async fn append_trade(
    conn: &mut PgConnection,
    market: &str,
    side: Side,
    size: Decimal,
    price: Decimal,
    external_trade_id: Option<&str>,
) -> anyhow::Result<TradeRecord> {
    let trade = sqlx::query_as::<_, TradeRecord>(
        r#"
        INSERT INTO trade_records (market, side, size, price, order_type, status, external_trade_id)
        VALUES ($1, $2, $3, $4, 'MARKET', 'FILLED', $5)
        RETURNING *
        "#,
    )
    .bind(market)
    .bind(side.as_str())
    .bind(size)
    .bind(price)
    .bind(external_trade_id)
    .fetch_one(&mut *conn)
    .await?;

    prune_history(conn).await?;

    Ok(trade)
}

/// Delete everything but the most recent HISTORY_KEEP trades.
pub async fn prune_history(conn: &mut PgConnection) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        DELETE FROM trade_records
        WHERE id NOT IN (
            SELECT id FROM trade_records
            ORDER BY created_at DESC, id DESC
            LIMIT $1
        )
        "#,
    )
    .bind(HISTORY_KEEP)
    .execute(conn)
    .await?;

    Ok(())
}

/// The N most recent trades, newest first.
pub async fn recent_trades(pool: &PgPool, limit: i64) -> anyhow::Result<Vec<TradeRecord>> {
    let trades = sqlx::query_as::<_, TradeRecord>(
        "SELECT * FROM trade_records ORDER BY created_at DESC, id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}
