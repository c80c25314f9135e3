use std::sync::Arc;
use std::time::Duration;

use paperfolio::api::router::create_router;
use paperfolio::config::AppConfig;
use paperfolio::db::{self, portfolio_repo};
use paperfolio::gateway::{MarketDataGateway, ParadexClient};
use paperfolio::metrics::init_metrics;
use paperfolio::portfolio::{AllocationPlanner, PnlCalculator, PnlTracker, TradeSimulator};
use paperfolio::pricing::{MarketRegistry, PriceResolver};
use paperfolio::services::market_refresh::run_market_refresh;
use paperfolio::services::Reporter;
use paperfolio::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = init_metrics();

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database connected");

    // Seed the ledger on a fresh database.
    portfolio_repo::init_portfolio(&db, config.initial_stable_balance).await?;

    // Every external call shares one client with a request-level timeout;
    // the resolver treats timeouts as retryable transport failures.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let gateway: Arc<dyn MarketDataGateway> = Arc::new(ParadexClient::new(
        http.clone(),
        config.gateway_base_url.clone(),
    ));
    let registry = Arc::new(MarketRegistry::new());
    let resolver = Arc::new(PriceResolver::new(gateway.clone(), registry.clone()));
    let pnl_tracker = Arc::new(PnlTracker::new());

    let reporter = if config.has_reporter() {
        Some(Arc::new(Reporter::new(
            http.clone(),
            config.reporter_url.clone().unwrap(),
            config.reporter_api_key.clone(),
            config.agent_id.clone(),
        )))
    } else {
        tracing::info!("No REPORTER_URL configured, trade reports disabled");
        None
    };

    let simulator = Arc::new(TradeSimulator::new(
        db.clone(),
        resolver.clone(),
        registry.clone(),
        pnl_tracker.clone(),
        reporter.clone(),
    ));
    let pnl = Arc::new(PnlCalculator::new(
        db.clone(),
        resolver.clone(),
        pnl_tracker.clone(),
    ));
    let planner = Arc::new(AllocationPlanner::new(db.clone()));

    // Keep the supported-token registry warm.
    {
        let gateway = gateway.clone();
        let registry = registry.clone();
        let refresh_secs = config.market_refresh_secs;
        tokio::spawn(async move {
            run_market_refresh(gateway, registry, refresh_secs).await;
        });
    }

    let state = AppState {
        db,
        config,
        gateway,
        registry,
        resolver,
        simulator,
        pnl,
        pnl_tracker,
        planner,
        reporter,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
