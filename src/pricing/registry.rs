use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Fallback list of tokens that are usually tradable on the venue. Used only
/// until the first market-listing refresh populates the registry.
const FALLBACK_TOKENS: &[&str] = &[
    "BTC", "ETH", "STRK", "LORDS", "USDT", "USDC", "WBTC", "UNI", "DAI",
    "RETH", "LUSD", "XSTRK", "NSTR", "ZEND", "SWAY", "SSTR", "WSTETH", "BROTHER",
];

/// How long a refreshed market listing stays authoritative.
const LISTING_VALIDITY: Duration = Duration::from_secs(30 * 60);

/// Result of a supported-token lookup.
#[derive(Debug, Clone, Serialize)]
pub struct TokenSupport {
    pub supported: bool,
    pub markets: Vec<String>,
    pub message: String,
}

/// Snapshot of one market-listing refresh.
#[derive(Debug, Clone, Serialize)]
pub struct MarketListing {
    pub tokens: Vec<String>,
    pub tradable_tokens: Vec<String>,
    pub markets: HashMap<String, Vec<String>>,
}

#[derive(Default)]
struct RegistryInner {
    token_markets: HashMap<String, Vec<String>>,
    tradable: HashSet<String>,
    refreshed_at: Option<Instant>,
}

/// Tracks which tokens the venue lists and which markets each trades in.
/// Refreshed periodically from the gateway's market listing; consulted by
/// the price resolver and the trade simulator before any pricing attempt.
pub struct MarketRegistry {
    inner: RwLock<RegistryInner>,
    validity: Duration,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            validity: LISTING_VALIDITY,
        }
    }

    /// Replace the registry contents from a fresh market listing.
    pub async fn apply_listing(&self, market_symbols: Vec<String>) -> MarketListing {
        let (tokens, tradable, token_markets) = extract_token_markets(&market_symbols);

        let listing = MarketListing {
            tokens: tokens.clone(),
            tradable_tokens: tradable.clone(),
            markets: token_markets.clone(),
        };

        let mut inner = self.inner.write().await;
        inner.token_markets = token_markets;
        inner.tradable = tradable.into_iter().collect();
        inner.refreshed_at = Some(Instant::now());

        listing
    }

    /// Known markets for a token, or None when the listing is cold/expired.
    pub async fn markets_for(&self, token: &str) -> Option<Vec<String>> {
        let inner = self.inner.read().await;
        if !is_valid(&inner, self.validity) {
            return None;
        }
        inner.token_markets.get(&token.to_uppercase()).cloned()
    }

    /// Whether a token has an active USD or BTC market. Falls back to the
    /// static seed list until the first listing refresh lands.
    pub async fn is_supported(&self, token: &str) -> TokenSupport {
        let normalized = token.to_uppercase();
        let inner = self.inner.read().await;

        if is_valid(&inner, self.validity) {
            let markets = inner
                .token_markets
                .get(&normalized)
                .cloned()
                .unwrap_or_default();

            if inner.tradable.contains(&normalized) {
                return TokenSupport {
                    supported: true,
                    message: format!(
                        "Token {token} is supported with {} active markets",
                        markets.len()
                    ),
                    markets,
                };
            }
            if !markets.is_empty() {
                return TokenSupport {
                    supported: false,
                    message: format!(
                        "Token {token} is listed but has no active USD or BTC markets"
                    ),
                    markets,
                };
            }
            return TokenSupport {
                supported: false,
                message: format!("Token {token} is not listed on the venue"),
                markets: vec![],
            };
        }

        let supported = FALLBACK_TOKENS.contains(&normalized.as_str());
        TokenSupport {
            supported,
            message: if supported {
                format!("Token {token} is supported (based on fallback list)")
            } else {
                format!("Token {token} may not be supported; refresh the market listing")
            },
            markets: vec![],
        }
    }
}

impl Default for MarketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid(inner: &RegistryInner, validity: Duration) -> bool {
    inner
        .refreshed_at
        .map(|t| t.elapsed() < validity)
        .unwrap_or(false)
}

/// Derive (all tokens, tradable tokens, token → markets) from raw market
/// symbols. A token is tradable when at least one of its markets quotes
/// against USD or BTC.
fn extract_token_markets(
    market_symbols: &[String],
) -> (Vec<String>, Vec<String>, HashMap<String, Vec<String>>) {
    let mut token_markets: HashMap<String, Vec<String>> = HashMap::new();

    for market in market_symbols {
        let Some(token) = market.split('-').next() else {
            continue;
        };
        if token.is_empty() {
            continue;
        }
        token_markets
            .entry(token.to_uppercase())
            .or_default()
            .push(market.clone());
    }

    let mut tokens: Vec<String> = token_markets.keys().cloned().collect();
    tokens.sort();

    let mut tradable: Vec<String> = token_markets
        .iter()
        .filter(|(_, markets)| {
            markets.iter().any(|m| {
                m.contains("-USD") || m.contains("-BTC") || m.contains("/USD") || m.contains("/BTC")
            })
        })
        .map(|(token, _)| token.clone())
        .collect();
    tradable.sort();

    (tokens, tradable, token_markets)
}
