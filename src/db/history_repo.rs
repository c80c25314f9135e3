use sqlx::{PgConnection, PgPool};

/// Rationale history is audit trail, not decision input; only a handful of
/// recent entries are retained.
const EXPLANATIONS_KEEP: i64 = 3;

/// Record a decision explanation and prune to the latest few.
pub async fn add_explanation(
    pool: &PgPool,
    explanation: &str,
    decision_type: Option<&str>,
    market: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO agent_explanations (explanation, decision_type, market)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(explanation)
    .bind(decision_type)
    .bind(market)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        DELETE FROM agent_explanations
        WHERE id NOT IN (
            SELECT id FROM agent_explanations
            ORDER BY created_at DESC, id DESC
            LIMIT $1
        )
        "#,
    )
    .bind(EXPLANATIONS_KEEP)
    .execute(pool)
    .await?;

    Ok(())
}

/// Save the strategy document inside the caller's transaction, keeping only
/// the most recent one.
pub async fn save_strategy(conn: &mut PgConnection, strategy_text: &str) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO strategy_notes (strategy_text) VALUES ($1)")
        .bind(strategy_text)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        DELETE FROM strategy_notes
        WHERE id NOT IN (
            SELECT id FROM strategy_notes
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        )
        "#,
    )
    .execute(conn)
    .await?;

    Ok(())
}

/// The current strategy document, if any.
pub async fn latest_strategy(pool: &PgPool) -> anyhow::Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT strategy_text FROM strategy_notes ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0))
}
