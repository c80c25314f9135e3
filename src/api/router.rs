use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // API routes
    let api = Router::new()
        // Portfolio
        .route("/api/portfolio", get(handlers::portfolio::overview))
        .route("/api/portfolio/init", post(handlers::portfolio::init))
        .route("/api/portfolio/reset", post(handlers::portfolio::reset))
        .route("/api/portfolio/pnl", get(handlers::portfolio::pnl))
        // Trades
        .route("/api/trades", get(handlers::trades::list))
        .route("/api/trades/simulate", post(handlers::trades::simulate))
        .route("/api/trades/decline", post(handlers::trades::decline))
        // Allocations
        .route(
            "/api/allocations",
            get(handlers::allocations::get_targets).put(handlers::allocations::set_targets),
        )
        // Tokens & prices
        .route("/api/tokens", get(handlers::tokens::list))
        .route(
            "/api/prices/cache",
            get(handlers::prices::cache_status).delete(handlers::prices::clear_cache),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
