use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::config::STABLE_SYMBOL;
use crate::db::portfolio_repo;
use crate::models::{AllocationDeviation, AllocationTarget, PortfolioPnl};
use crate::portfolio::compare_allocations;
use crate::AppState;

#[derive(Serialize)]
pub struct PortfolioOverview {
    pub pnl: PortfolioPnl,
    pub targets: Vec<AllocationTarget>,
    pub rebalancing: Vec<AllocationDeviation>,
}

/// Full portfolio view: valuations, PnL, targets and rebalancing flags.
pub async fn overview(State(state): State<AppState>) -> Json<ApiResponse<PortfolioOverview>> {
    let pnl = match state.pnl.compute().await {
        Ok(p) => p,
        Err(e) => return ApiResponse::err(e.to_string()),
    };

    let targets = match state.planner.get_targets().await {
        Ok(t) => t,
        Err(e) => return ApiResponse::err(e.to_string()),
    };

    let rebalancing = compare_allocations(&targets, &pnl.tokens);

    ApiResponse::ok(PortfolioOverview {
        pnl,
        targets,
        rebalancing,
    })
}

/// Recompute PnL for every held token.
pub async fn pnl(State(state): State<AppState>) -> Json<ApiResponse<PortfolioPnl>> {
    match state.pnl.compute().await {
        Ok(report) => {
            if let Some(reporter) = &state.reporter {
                reporter.report_pnl(&report).await;
            }
            ApiResponse::ok(report)
        }
        Err(e) => ApiResponse::err(e.to_string()),
    }
}

/// Seed the ledger with the initial stablecoin balance. Idempotent.
pub async fn init(State(state): State<AppState>) -> Json<ApiResponse<String>> {
    match portfolio_repo::init_portfolio(&state.db, state.config.initial_stable_balance).await {
        Ok(true) => ApiResponse::ok(format!(
            "Portfolio initialized with {} {STABLE_SYMBOL}",
            state.config.initial_stable_balance
        )),
        Ok(false) => ApiResponse::ok(format!(
            "Portfolio already initialized with {STABLE_SYMBOL}"
        )),
        Err(e) => ApiResponse::err(e.to_string()),
    }
}

#[derive(Deserialize, Default)]
pub struct ResetRequest {
    /// Carry the current stablecoin balance over instead of the default.
    #[serde(default)]
    pub keep_stable: bool,
    /// Explicit stablecoin balance to reseed with; overrides `keep_stable`.
    pub stable_amount: Option<Decimal>,
}

/// Delete every position and reseed the stablecoin row.
pub async fn reset(
    State(state): State<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Json<ApiResponse<String>> {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let mut balance = state.config.initial_stable_balance;
    if req.keep_stable {
        match portfolio_repo::get_position(&state.db, STABLE_SYMBOL).await {
            Ok(Some(pos)) => balance = pos.balance,
            Ok(None) => {}
            Err(e) => return ApiResponse::err(e.to_string()),
        }
    }
    if let Some(amount) = req.stable_amount {
        balance = amount;
    }

    match portfolio_repo::reset_portfolio(&state.db, balance).await {
        Ok(()) => ApiResponse::ok(format!("Portfolio reset with {balance} {STABLE_SYMBOL}")),
        Err(e) => ApiResponse::err(e.to_string()),
    }
}
