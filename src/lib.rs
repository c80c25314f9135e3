pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod portfolio;
pub mod pricing;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::MarketDataGateway;
use crate::portfolio::{AllocationPlanner, PnlCalculator, PnlTracker, TradeSimulator};
use crate::pricing::{MarketRegistry, PriceResolver};
use crate::services::Reporter;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub gateway: Arc<dyn MarketDataGateway>,
    pub registry: Arc<MarketRegistry>,
    pub resolver: Arc<PriceResolver>,
    pub simulator: Arc<TradeSimulator>,
    pub pnl: Arc<PnlCalculator>,
    pub pnl_tracker: Arc<PnlTracker>,
    pub planner: Arc<AllocationPlanner>,
    pub reporter: Option<Arc<Reporter>>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
