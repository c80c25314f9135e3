use std::sync::Arc;
use tokio::time::{interval, Duration};

use crate::gateway::MarketDataGateway;
use crate::pricing::MarketRegistry;

/// Run the market-listing refresh loop. Periodically fetches the venue's
/// market list and rebuilds the token registry that the price resolver and
/// trade simulator consult. The first tick fires immediately so the registry
/// warms up at startup.
pub async fn run_market_refresh(
    gateway: Arc<dyn MarketDataGateway>,
    registry: Arc<MarketRegistry>,
    interval_secs: u64,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;

        match gateway.list_markets().await {
            Ok(market_symbols) => {
                let total = market_symbols.len();
                let listing = registry.apply_listing(market_symbols).await;
                tracing::info!(
                    markets = total,
                    tokens = listing.tokens.len(),
                    tradable = listing.tradable_tokens.len(),
                    "Market listing refreshed"
                );

                let untradable = listing.tokens.len() - listing.tradable_tokens.len();
                if untradable > 0 {
                    tracing::debug!(
                        untradable,
                        "Tokens without active USD or BTC markets"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch market listing");
            }
        }
    }
}
