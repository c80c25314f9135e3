use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::ApiResponse;
use crate::pricing::CacheEntryStatus;
use crate::AppState;

/// Diagnostic view of the price cache.
pub async fn cache_status(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<CacheEntryStatus>>> {
    ApiResponse::ok(state.resolver.cache_snapshot().await)
}

#[derive(Deserialize, Default)]
pub struct ClearCacheQuery {
    pub symbol: Option<String>,
}

/// Drop one symbol's cache entry, or the whole cache.
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(query): Query<ClearCacheQuery>,
) -> Json<ApiResponse<String>> {
    state.resolver.clear_cache(query.symbol.as_deref()).await;

    ApiResponse::ok(match query.symbol {
        Some(symbol) => format!("Cleared price cache for {}", symbol.to_uppercase()),
        None => "Cleared all price cache".to_string(),
    })
}
