use sqlx::{PgConnection, PgPool};

use crate::models::{AllocationTarget, TokenAllocation};

/// Replace the full target set inside the caller's transaction: delete-all,
/// insert-all, so a failed write never leaves a partial mix of old and new
/// targets.
pub async fn replace_targets(
    conn: &mut PgConnection,
    allocations: &[TokenAllocation],
    notes: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM allocation_targets")
        .execute(&mut *conn)
        .await?;

    for allocation in allocations {
        sqlx::query(
            r#"
            INSERT INTO allocation_targets (token_symbol, target_percentage, notes)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&allocation.symbol)
        .bind(allocation.percentage)
        .bind(notes)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// All targets, largest share first.
pub async fn get_targets(pool: &PgPool) -> anyhow::Result<Vec<AllocationTarget>> {
    let targets = sqlx::query_as::<_, AllocationTarget>(
        "SELECT * FROM allocation_targets ORDER BY target_percentage DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(targets)
}
