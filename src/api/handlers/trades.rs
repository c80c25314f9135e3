use axum::extract::State;
use axum::Json;
use metrics::counter;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::ApiResponse;
use crate::db::{history_repo, trade_repo};
use crate::errors::AppError;
use crate::models::TradeRecord;
use crate::portfolio::{TradeError, TradeReceipt};
use crate::AppState;

#[derive(Deserialize)]
pub struct SimulateTradeRequest {
    pub from_token: String,
    pub to_token: String,
    pub from_amount: Decimal,
    pub explanation: Option<String>,
}

/// Execute a simulated two-leg conversion against the ledger.
pub async fn simulate(
    State(state): State<AppState>,
    Json(req): Json<SimulateTradeRequest>,
) -> Json<ApiResponse<TradeReceipt>> {
    match state
        .simulator
        .trade(
            &req.from_token,
            &req.to_token,
            req.from_amount,
            req.explanation.as_deref(),
        )
        .await
    {
        Ok(receipt) => ApiResponse::ok(receipt),
        Err(e) => {
            match &e {
                TradeError::Db(_) | TradeError::Internal(_) => {
                    tracing::error!(error = %e, "Trade failed internally");
                }
                _ => {
                    counter!("trades_rejected_total").increment(1);
                    tracing::warn!(error = %e, "Trade rejected");
                }
            }
            ApiResponse::err(e.to_string())
        }
    }
}

#[derive(Deserialize)]
pub struct DeclineRequest {
    pub explanation: String,
}

/// A conscious decision not to trade, recorded with its rationale.
pub async fn decline(
    State(state): State<AppState>,
    Json(req): Json<DeclineRequest>,
) -> Json<ApiResponse<String>> {
    if !state.pnl_tracker.is_recent() {
        tracing::warn!(
            age_secs = ?state.pnl_tracker.age_secs(),
            "Declining to trade without a recent PnL check"
        );
    }

    if let Err(e) =
        history_repo::add_explanation(&state.db, &req.explanation, Some("no_trade"), None).await
    {
        return ApiResponse::err(e.to_string());
    }

    if let Some(reporter) = &state.reporter {
        reporter.report_no_trade(&req.explanation).await;
    }

    ApiResponse::ok("Decision not to trade recorded".to_string())
}

/// Recent trade history, newest first.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TradeRecord>>>, AppError> {
    let trades = trade_repo::recent_trades(&state.db, 8)
        .await
        .map_err(AppError::Internal)?;
    Ok(ApiResponse::ok(trades))
}
