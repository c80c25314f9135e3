use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{BboQuote, GatewayError, MarketDataGateway};

#[derive(Debug, Deserialize)]
struct MarketEntry {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct MarketListResponse {
    results: Vec<MarketEntry>,
}

/// Paradex-style REST market-data client.
#[derive(Debug, Clone)]
pub struct ParadexClient {
    http: Client,
    base_url: String,
}

impl ParadexClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MarketDataGateway for ParadexClient {
    async fn fetch_bbo(&self, market: &str) -> Result<BboQuote, GatewayError> {
        let url = format!("{}/bbo/{}", self.base_url, market);
        let resp = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?;

        let quote: BboQuote = resp.json().await?;
        Ok(quote)
    }

    async fn list_markets(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}/markets", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?;

        let list: MarketListResponse = resp.json().await?;
        Ok(list.results.into_iter().map(|m| m.symbol).collect())
    }
}
