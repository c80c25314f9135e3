pub mod paradex;

pub use paradex::ParadexClient;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Best bid/offer for a market. Prices arrive as strings from the venue and
/// are parsed by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BboQuote {
    pub bid: Option<String>,
    pub ask: Option<String>,
}

/// A trading venue's market-data surface: best-bid/offer quotes and the
/// market listing. Implemented over HTTP in production and mocked in tests.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Fetch the current best bid/offer for a market symbol.
    async fn fetch_bbo(&self, market: &str) -> Result<BboQuote, GatewayError>;

    /// Fetch all market symbols currently listed on the venue.
    async fn list_markets(&self) -> Result<Vec<String>, GatewayError>;
}
