use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::{allocation_repo, history_repo};
use crate::models::{
    AllocationDeviation, AllocationTarget, RebalanceAction, TokenAllocation, TokenPnl,
};

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no allocations provided")]
    Empty,

    #[error("total allocation percentage must equal 100%, got {0}%")]
    InvalidTotal(Decimal),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Stores target allocation percentages and compares them against the
/// current computed allocations to flag rebalancing needs.
pub struct AllocationPlanner {
    pool: PgPool,
}

impl AllocationPlanner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the full target set. Rejects any list whose percentages do
    /// not sum to 100 (± 0.01) with no partial write; the old targets stay
    /// in place.
    pub async fn set_targets(
        &self,
        allocations: &[TokenAllocation],
        reasoning: Option<&str>,
    ) -> Result<Vec<TokenAllocation>, AllocationError> {
        validate_total(allocations)?;

        let normalized: Vec<TokenAllocation> = allocations
            .iter()
            .map(|a| TokenAllocation {
                symbol: a.symbol.to_uppercase(),
                percentage: a.percentage,
            })
            .collect();

        let mut tx = self.pool.begin().await?;
        allocation_repo::replace_targets(&mut tx, &normalized, reasoning).await?;
        if let Some(reasoning) = reasoning {
            history_repo::save_strategy(&mut tx, reasoning).await?;
        }
        tx.commit().await?;

        tracing::info!(targets = normalized.len(), "Allocation targets replaced");
        Ok(normalized)
    }

    pub async fn get_targets(&self) -> Result<Vec<AllocationTarget>, AllocationError> {
        Ok(allocation_repo::get_targets(&self.pool).await?)
    }
}

fn validate_total(allocations: &[TokenAllocation]) -> Result<(), AllocationError> {
    if allocations.is_empty() {
        return Err(AllocationError::Empty);
    }

    let total: Decimal = allocations.iter().map(|a| a.percentage).sum();
    let tolerance = Decimal::new(1, 2); // 0.01
    if (total - Decimal::ONE_HUNDRED).abs() > tolerance {
        return Err(AllocationError::InvalidTotal(total));
    }

    Ok(())
}

/// Flag every target whose current allocation drifted more than the
/// threshold, worst offenders first.
pub fn compare_allocations(
    targets: &[AllocationTarget],
    tokens: &[TokenPnl],
) -> Vec<AllocationDeviation> {
    let threshold = Decimal::from(5);
    let mut deviations: Vec<AllocationDeviation> = Vec::new();

    for target in targets {
        let current = tokens
            .iter()
            .find(|t| t.token == target.token_symbol)
            .map(|t| t.allocation_percentage)
            .unwrap_or(Decimal::ZERO);

        let deviation = current - target.target_percentage;
        if deviation.abs() <= threshold {
            continue;
        }

        let (action, suggestion) = if deviation > Decimal::ZERO {
            (
                RebalanceAction::Reduce,
                format!(
                    "REDUCE {}: currently {:.2}%, target {:.2}% ({:.2}% overweight)",
                    target.token_symbol, current, target.target_percentage, deviation
                ),
            )
        } else {
            (
                RebalanceAction::Increase,
                format!(
                    "INCREASE {}: currently {:.2}%, target {:.2}% ({:.2}% underweight)",
                    target.token_symbol,
                    current,
                    target.target_percentage,
                    deviation.abs()
                ),
            )
        };

        deviations.push(AllocationDeviation {
            symbol: target.token_symbol.clone(),
            current_percentage: current,
            target_percentage: target.target_percentage,
            deviation,
            action,
            suggestion,
        });
    }

    deviations.sort_by(|a, b| b.deviation.abs().cmp(&a.deviation.abs()));
    deviations
}
