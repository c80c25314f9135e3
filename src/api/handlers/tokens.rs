use axum::extract::State;
use axum::Json;

use super::ApiResponse;
use crate::pricing::MarketListing;
use crate::AppState;

/// Fetch the venue's market listing, refresh the registry, and return the
/// supported tokens with their markets.
pub async fn list(State(state): State<AppState>) -> Json<ApiResponse<MarketListing>> {
    match state.gateway.list_markets().await {
        Ok(market_symbols) => {
            let listing = state.registry.apply_listing(market_symbols).await;
            ApiResponse::ok(listing)
        }
        Err(e) => ApiResponse::err(e.to_string()),
    }
}
