use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::ApiResponse;
use crate::models::{AllocationTarget, TokenAllocation};
use crate::AppState;

/// Current targets, largest share first.
pub async fn get_targets(State(state): State<AppState>) -> Json<ApiResponse<Vec<AllocationTarget>>> {
    match state.planner.get_targets().await {
        Ok(targets) => ApiResponse::ok(targets),
        Err(e) => ApiResponse::err(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct SetTargetsRequest {
    pub allocations: Vec<TokenAllocation>,
    pub reasoning: Option<String>,
}

/// Replace the target allocation set. Rejected wholesale unless the
/// percentages sum to 100.
pub async fn set_targets(
    State(state): State<AppState>,
    Json(req): Json<SetTargetsRequest>,
) -> Json<ApiResponse<Vec<TokenAllocation>>> {
    match state
        .planner
        .set_targets(&req.allocations, req.reasoning.as_deref())
        .await
    {
        Ok(normalized) => ApiResponse::ok(normalized),
        Err(e) => ApiResponse::err(e.to_string()),
    }
}
