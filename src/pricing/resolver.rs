use metrics::counter;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::gateway::MarketDataGateway;
use crate::pricing::cache::{format_age, CacheEntryStatus, PriceCache};
use crate::pricing::ranges::PriceRanges;
use crate::pricing::registry::MarketRegistry;

const CACHE_TTL: Duration = Duration::from_secs(30 * 60);
const MAX_RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Generic market symbols to probe when the registry has no listing for a
/// token, tried in order.
const GENERIC_MARKET_FORMATS: &[&str] = &["{SYMBOL}-USD-PERP", "{SYMBOL}-USD", "{SYMBOL}-BTC"];

/// Discount applied to the ask when a market has no bid.
fn synthetic_bid(ask: Decimal) -> Decimal {
    ask * Decimal::new(995, 3)
}

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("could not resolve a plausible price for {0} after trying all methods")]
    Unresolved(String),
}

#[derive(Debug, Clone)]
struct ResolvedPrice {
    price: Decimal,
    source: String,
}

/// Resolves token symbols to USD prices: stable pins, TTL cache, known
/// markets from the registry, generic symbol formats, BTC-cross conversion,
/// and expired-cache/typical-value fallbacks, with plausibility filtering at
/// every step. Never returns a price it considers implausible.
pub struct PriceResolver {
    gateway: Arc<dyn MarketDataGateway>,
    registry: Arc<MarketRegistry>,
    ranges: PriceRanges,
    stable_tokens: HashSet<String>,
    cache: Mutex<PriceCache>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl PriceResolver {
    pub fn new(gateway: Arc<dyn MarketDataGateway>, registry: Arc<MarketRegistry>) -> Self {
        Self {
            gateway,
            registry,
            ranges: PriceRanges::default(),
            stable_tokens: ["USDC", "USDT", "DAI"]
                .into_iter()
                .map(String::from)
                .collect(),
            cache: Mutex::new(PriceCache::new(CACHE_TTL)),
            max_attempts: MAX_RETRY_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_ranges(mut self, ranges: PriceRanges) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Mutex::new(PriceCache::new(ttl));
        self
    }

    /// Resolve a token's USD price. `force_fresh` skips the cache, which
    /// trading paths require; valuation paths may accept cached prices.
    ///
    /// Failure surfaces as `PriceError::Unresolved`, never as a default
    /// numeric value.
    pub async fn get_price(&self, symbol: &str, force_fresh: bool) -> Result<Decimal, PriceError> {
        let symbol = symbol.to_uppercase();

        // Stable tokens are pinned at 1.0; no network, no cache.
        if self.stable_tokens.contains(&symbol) {
            return Ok(Decimal::ONE);
        }

        counter!("price_lookups_total").increment(1);

        let support = self.registry.is_supported(&symbol).await;
        if !support.supported {
            tracing::warn!(
                symbol = %symbol,
                message = %support.message,
                "Token not tradable, cannot fetch price"
            );
            return Err(PriceError::Unresolved(symbol));
        }

        let cached = {
            let cache = self.cache.lock().await;
            cache
                .get(&symbol)
                .map(|entry| (entry.clone(), cache.is_fresh(entry)))
        };

        if !force_fresh {
            if let Some((entry, true)) = &cached {
                if self.ranges.is_plausible(&symbol, entry.price) {
                    counter!("price_cache_hits_total").increment(1);
                    tracing::debug!(
                        symbol = %symbol,
                        price = %entry.price,
                        source = %entry.source,
                        "Using cached price"
                    );
                    return Ok(entry.price);
                }
                tracing::warn!(
                    symbol = %symbol,
                    price = %entry.price,
                    "Cached price outside plausible range, forcing refresh"
                );
            }
        }

        if let Some(fresh) = self.fetch_fresh(&symbol).await {
            self.cache
                .lock()
                .await
                .insert(&symbol, fresh.price, &fresh.source);
            return Ok(fresh.price);
        }

        // No plausible fresh price. Fall back to the last cached plausible
        // value even if expired, then to the configured typical price.
        if let Some((entry, _)) = &cached {
            if self.ranges.is_plausible(&symbol, entry.price) {
                tracing::warn!(
                    symbol = %symbol,
                    price = %entry.price,
                    source = %entry.source,
                    age = %format_age(entry.fetched_at.elapsed()),
                    "Using cached price as fallback"
                );
                return Ok(entry.price);
            }
        }

        if let Some(typical) = self.ranges.typical(&symbol) {
            tracing::warn!(
                symbol = %symbol,
                price = %typical,
                "Using typical reference price as last resort"
            );
            return Ok(typical);
        }

        tracing::error!(symbol = %symbol, "Could not resolve any plausible price");
        Err(PriceError::Unresolved(symbol))
    }

    /// Attempt a fresh quote. Only ever returns plausible prices.
    async fn fetch_fresh(&self, symbol: &str) -> Option<ResolvedPrice> {
        if let Some(known) = self
            .registry
            .markets_for(symbol)
            .await
            .filter(|m| !m.is_empty())
        {
            let filtered: Vec<String> = known
                .iter()
                .filter(|m| !is_excluded_market(m))
                .cloned()
                .collect();
            let markets = if filtered.is_empty() {
                tracing::warn!(
                    symbol = %symbol,
                    total = known.len(),
                    "All known markets matched exclusion patterns, using original list"
                );
                known.clone()
            } else {
                filtered
            };

            for market in prioritize_usd_markets(&markets) {
                if let Some(found) = self.try_market(symbol, &market, true).await {
                    return Some(found);
                }
            }

            // BTC-quoted markets, converted through BTC's own USD price.
            let btc_markets: Vec<String> = markets
                .iter()
                .filter(|m| m.contains("-BTC"))
                .cloned()
                .collect();
            if !btc_markets.is_empty() && symbol != "BTC" {
                match Box::pin(self.get_price("BTC", false)).await {
                    Ok(btc_usd) => {
                        for market in &btc_markets {
                            let Some(found) = self.try_market(symbol, market, false).await else {
                                continue;
                            };
                            let usd_price = found.price * btc_usd;
                            if self.ranges.is_plausible(symbol, usd_price) {
                                tracing::info!(
                                    symbol = %symbol,
                                    market = %market,
                                    price_btc = %found.price,
                                    price_usd = %usd_price,
                                    "Resolved price via BTC conversion"
                                );
                                return Some(ResolvedPrice {
                                    price: usd_price,
                                    source: format!("{market} (via BTC)"),
                                });
                            }
                            counter!("price_candidates_rejected_total").increment(1);
                            tracing::warn!(
                                symbol = %symbol,
                                market = %market,
                                price = %usd_price,
                                "Rejected implausible BTC-derived price"
                            );
                        }
                    }
                    Err(_) => {
                        tracing::warn!(
                            symbol = %symbol,
                            "Could not resolve BTC price for cross conversion"
                        );
                    }
                }
            }
        }

        // Registry knows nothing useful: probe the generic symbol formats.
        tracing::debug!(symbol = %symbol, "Trying generic market formats");
        for template in GENERIC_MARKET_FORMATS {
            let market = template.replace("{SYMBOL}", symbol);
            if is_excluded_market(&market) {
                continue;
            }
            if let Some(found) = self.try_market(symbol, &market, true).await {
                return Some(found);
            }
        }

        None
    }

    /// Query one market with bounded retry. Uses the bid, or a synthetic bid
    /// derived from the ask when no bid exists. When `check_plausible` is
    /// false the raw quote is returned (BTC-denominated legs are validated
    /// after conversion).
    async fn try_market(
        &self,
        symbol: &str,
        market: &str,
        check_plausible: bool,
    ) -> Option<ResolvedPrice> {
        for attempt in 1..=self.max_attempts {
            match self.gateway.fetch_bbo(market).await {
                Ok(quote) => {
                    if let Some(bid) = quote.bid.as_deref().and_then(parse_positive) {
                        if !check_plausible || self.ranges.is_plausible(symbol, bid) {
                            tracing::debug!(
                                symbol = %symbol,
                                market = %market,
                                price = %bid,
                                attempt,
                                "Got bid price"
                            );
                            return Some(ResolvedPrice {
                                price: bid,
                                source: market.to_string(),
                            });
                        }
                        counter!("price_candidates_rejected_total").increment(1);
                        tracing::warn!(
                            symbol = %symbol,
                            market = %market,
                            price = %bid,
                            "Rejected implausible bid"
                        );
                    } else if quote.bid.is_none() {
                        if let Some(ask) = quote.ask.as_deref().and_then(parse_positive) {
                            let estimated = synthetic_bid(ask);
                            if !check_plausible || self.ranges.is_plausible(symbol, estimated) {
                                tracing::debug!(
                                    symbol = %symbol,
                                    market = %market,
                                    price = %estimated,
                                    ask = %ask,
                                    attempt,
                                    "Using adjusted ask as synthetic bid"
                                );
                                return Some(ResolvedPrice {
                                    price: estimated,
                                    source: format!("{market} (adjusted ask)"),
                                });
                            }
                            counter!("price_candidates_rejected_total").increment(1);
                            tracing::warn!(
                                symbol = %symbol,
                                market = %market,
                                price = %estimated,
                                "Rejected implausible adjusted ask"
                            );
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        market = %market,
                        attempt,
                        error = %e,
                        "Market quote failed"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        None
    }

    /// Drop the cache entry for one symbol, or the whole cache.
    pub async fn clear_cache(&self, symbol: Option<&str>) {
        let normalized = symbol.map(|s| s.to_uppercase());
        self.cache.lock().await.clear(normalized.as_deref());
        tracing::info!(symbol = ?normalized, "Price cache cleared");
    }

    /// Diagnostic snapshot of the cache.
    pub async fn cache_snapshot(&self) -> Vec<CacheEntryStatus> {
        self.cache.lock().await.snapshot()
    }
}

fn parse_positive(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim())
        .ok()
        .filter(|p| *p > Decimal::ZERO)
}

/// Markets skipped during price resolution: option contracts, USDT-quoted
/// pairs, and far-dated futures with long numeric suffixes.
fn is_excluded_market(market: &str) -> bool {
    if market.ends_with("-USDT") {
        return true;
    }

    let parts: Vec<&str> = market.split('-').collect();
    let n = parts.len();

    // Option contracts: {BASE}-USD-{STRIKE}-C or -P
    if n >= 4
        && (parts[n - 1] == "C" || parts[n - 1] == "P")
        && !parts[n - 2].is_empty()
        && parts[n - 2].bytes().all(|b| b.is_ascii_digit())
        && parts[n - 3] == "USD"
    {
        return true;
    }

    // Dated futures: symbol ends in a 5+ digit block
    if let Some(last) = parts.last() {
        if last.len() >= 5 && last.bytes().all(|b| b.is_ascii_digit()) {
            return true;
        }
    }

    false
}

/// Order USD-quoted markets spot-first, then perpetuals, then anything else
/// USD-quoted. BTC-quoted markets are handled separately.
fn prioritize_usd_markets(markets: &[String]) -> Vec<String> {
    let spot: Vec<String> = markets
        .iter()
        .filter(|m| m.contains("-USD") && !m.contains("-USD-"))
        .cloned()
        .collect();
    let perp: Vec<String> = markets
        .iter()
        .filter(|m| m.contains("-USD-PERP"))
        .cloned()
        .collect();
    let other: Vec<String> = markets
        .iter()
        .filter(|m| m.contains("-USD") && !spot.contains(m) && !perp.contains(m))
        .cloned()
        .collect();

    spot.into_iter().chain(perp).chain(other).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
