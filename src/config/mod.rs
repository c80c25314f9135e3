use rust_decimal::Decimal;
use std::env;

const DEFAULT_GATEWAY_URL: &str = "https://api.prod.paradex.trade/v1";

/// The USD-equivalent token that anchors the ledger. Priced at 1.0, never
/// resolved over the network.
pub const STABLE_SYMBOL: &str = "USDC";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Market data gateway
    pub gateway_base_url: String,
    pub request_timeout_secs: u64,
    pub market_refresh_secs: u64,

    // Reporting backend (optional; reports are skipped when unset)
    pub reporter_url: Option<String>,
    pub reporter_api_key: Option<String>,
    pub agent_id: String,

    // Portfolio
    pub initial_stable_balance: Decimal,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            gateway_base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.into()),
            request_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            market_refresh_secs: env::var("MARKET_REFRESH_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .unwrap_or(900),

            reporter_url: env::var("REPORTER_URL").ok(),
            reporter_api_key: env::var("REPORTER_API_KEY").ok(),
            agent_id: env::var("AGENT_ID").unwrap_or_else(|_| "local".into()),

            initial_stable_balance: env::var("INITIAL_STABLE_BALANCE")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .unwrap_or(Decimal::from(1_000)),
        })
    }

    /// Returns true if a reporting backend is configured.
    pub fn has_reporter(&self) -> bool {
        self.reporter_url.is_some()
    }
}
