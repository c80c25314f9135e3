use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::config::STABLE_SYMBOL;
use crate::models::PortfolioPosition;

/// Look up the position row for a token.
pub async fn get_position(
    pool: &PgPool,
    symbol: &str,
) -> anyhow::Result<Option<PortfolioPosition>> {
    let row = sqlx::query_as::<_, PortfolioPosition>(
        "SELECT * FROM portfolio_positions WHERE token_symbol = $1",
    )
    .bind(symbol)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All position rows, including zero balances.
pub async fn all_positions(pool: &PgPool) -> anyhow::Result<Vec<PortfolioPosition>> {
    let rows = sqlx::query_as::<_, PortfolioPosition>(
        "SELECT * FROM portfolio_positions ORDER BY token_symbol",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Positions with a positive balance.
pub async fn held_positions(pool: &PgPool) -> anyhow::Result<Vec<PortfolioPosition>> {
    let rows = sqlx::query_as::<_, PortfolioPosition>(
        "SELECT * FROM portfolio_positions WHERE balance > 0 ORDER BY token_symbol",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Debit a position inside a transaction. The balance guard in the WHERE
/// clause makes a negative balance impossible even under concurrent callers;
/// returns None when the balance was insufficient.
pub async fn debit(
    conn: &mut PgConnection,
    symbol: &str,
    amount: Decimal,
) -> anyhow::Result<Option<PortfolioPosition>> {
    let row = sqlx::query_as::<_, PortfolioPosition>(
        r#"
        UPDATE portfolio_positions
        SET balance = balance - $2, updated_at = NOW()
        WHERE token_symbol = $1 AND balance >= $2
        RETURNING *
        "#,
    )
    .bind(symbol)
    .bind(amount)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Volume-weighted average entry price after crediting `amount` at `price`
/// onto an existing position.
pub fn weighted_entry_price(
    old_balance: Decimal,
    old_entry: Option<Decimal>,
    amount: Decimal,
    price: Decimal,
) -> Decimal {
    if old_balance <= Decimal::ZERO {
        return price;
    }
    let old_entry = old_entry.unwrap_or(price);
    (old_balance * old_entry + amount * price) / (old_balance + amount)
}

/// Credit a position inside a transaction, creating the row on first
/// acquisition. The entry price becomes the volume-weighted average; the
/// entry timestamp is set once and preserved across top-ups.
pub async fn credit(
    conn: &mut PgConnection,
    symbol: &str,
    amount: Decimal,
    price: Decimal,
) -> anyhow::Result<PortfolioPosition> {
    let existing = sqlx::query_as::<_, PortfolioPosition>(
        "SELECT * FROM portfolio_positions WHERE token_symbol = $1 FOR UPDATE",
    )
    .bind(symbol)
    .fetch_optional(&mut *conn)
    .await?;

    let row = match existing {
        Some(pos) => {
            let new_balance = pos.balance + amount;
            let new_entry = weighted_entry_price(pos.balance, pos.entry_price, amount, price);

            sqlx::query_as::<_, PortfolioPosition>(
                r#"
                UPDATE portfolio_positions
                SET balance = $2,
                    entry_price = $3,
                    entry_timestamp = COALESCE(entry_timestamp, NOW()),
                    updated_at = NOW()
                WHERE token_symbol = $1
                RETURNING *
                "#,
            )
            .bind(symbol)
            .bind(new_balance)
            .bind(new_entry)
            .fetch_one(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, PortfolioPosition>(
                r#"
                INSERT INTO portfolio_positions (token_symbol, balance, entry_price, entry_timestamp)
                VALUES ($1, $2, $3, NOW())
                RETURNING *
                "#,
            )
            .bind(symbol)
            .bind(amount)
            .bind(price)
            .fetch_one(conn)
            .await?
        }
    };

    Ok(row)
}

/// Persist refreshed PnL figures onto a position row.
pub async fn update_pnl(
    pool: &PgPool,
    symbol: &str,
    unrealized_pnl: Decimal,
    pnl_percentage: Decimal,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE portfolio_positions
        SET unrealized_pnl = $2, pnl_percentage = $3, updated_at = NOW()
        WHERE token_symbol = $1
        "#,
    )
    .bind(symbol)
    .bind(unrealized_pnl)
    .bind(pnl_percentage)
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the ledger with the stablecoin base row. Idempotent: returns false
/// when a stablecoin row already exists.
pub async fn init_portfolio(pool: &PgPool, initial_balance: Decimal) -> anyhow::Result<bool> {
    if get_position(pool, STABLE_SYMBOL).await?.is_some() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO portfolio_positions (token_symbol, balance, entry_price, entry_timestamp)
        VALUES ($1, $2, 1.0, NOW())
        "#,
    )
    .bind(STABLE_SYMBOL)
    .bind(initial_balance)
    .execute(pool)
    .await?;

    tracing::info!(balance = %initial_balance, "Portfolio seeded with {STABLE_SYMBOL}");
    Ok(true)
}

/// Delete every position and reseed the stablecoin row. The delete and the
/// reseed commit together.
pub async fn reset_portfolio(pool: &PgPool, stable_balance: Decimal) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM portfolio_positions")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO portfolio_positions
            (token_symbol, balance, entry_price, entry_timestamp, unrealized_pnl, pnl_percentage)
        VALUES ($1, $2, 1.0, NOW(), 0, 0)
        "#,
    )
    .bind(STABLE_SYMBOL)
    .bind(stable_balance)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(balance = %stable_balance, "Portfolio reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_weighted_entry_price_top_up() {
        // 1 @ 100 plus 1 @ 200 averages to 150.
        let entry = weighted_entry_price(dec!(1), Some(dec!(100)), dec!(1), dec!(200));
        assert_eq!(entry, dec!(150));

        // 3 @ 10 plus 1 @ 30 averages to 15.
        let entry = weighted_entry_price(dec!(3), Some(dec!(10)), dec!(1), dec!(30));
        assert_eq!(entry, dec!(15));
    }

    #[test]
    fn test_weighted_entry_price_first_acquisition() {
        assert_eq!(
            weighted_entry_price(dec!(0), None, dec!(2), dec!(55)),
            dec!(55)
        );
        // A zero-balance row behaves like a fresh acquisition.
        assert_eq!(
            weighted_entry_price(dec!(0), Some(dec!(999)), dec!(2), dec!(55)),
            dec!(55)
        );
    }

    #[test]
    fn test_weighted_entry_price_missing_old_entry() {
        // No recorded entry price on an existing balance: the credit price
        // stands in for the unknown history.
        assert_eq!(
            weighted_entry_price(dec!(4), None, dec!(4), dec!(10)),
            dec!(10)
        );
    }
}
