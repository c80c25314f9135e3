use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use paperfolio::gateway::{BboQuote, GatewayError, MarketDataGateway};

/// Connect to the test database and run all migrations. Returns None when
/// TEST_DATABASE_URL is not set so the suite passes without a live Postgres.
///
/// These tests share one database; run with `--test-threads=1` when
/// TEST_DATABASE_URL is set.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean tables for test isolation
    sqlx::query("DELETE FROM trade_records").execute(&pool).await.ok();
    sqlx::query("DELETE FROM allocation_targets").execute(&pool).await.ok();
    sqlx::query("DELETE FROM agent_explanations").execute(&pool).await.ok();
    sqlx::query("DELETE FROM strategy_notes").execute(&pool).await.ok();
    sqlx::query("DELETE FROM portfolio_positions").execute(&pool).await.ok();

    Some(pool)
}

/// Gateway stub serving fixed bid quotes.
#[allow(dead_code)]
pub struct StaticGateway {
    quotes: HashMap<String, BboQuote>,
}

impl StaticGateway {
    #[allow(dead_code)]
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        let quotes = entries
            .iter()
            .map(|(market, bid)| {
                (
                    market.to_string(),
                    BboQuote {
                        bid: Some(bid.to_string()),
                        ask: None,
                    },
                )
            })
            .collect();
        Arc::new(Self { quotes })
    }
}

#[async_trait]
impl MarketDataGateway for StaticGateway {
    async fn fetch_bbo(&self, market: &str) -> Result<BboQuote, GatewayError> {
        self.quotes
            .get(market)
            .cloned()
            .ok_or_else(|| GatewayError::Unexpected(format!("no market {market}")))
    }

    async fn list_markets(&self) -> Result<Vec<String>, GatewayError> {
        Ok(self.quotes.keys().cloned().collect())
    }
}
