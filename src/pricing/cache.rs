use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A resolved price together with where and when it was obtained.
#[derive(Debug, Clone)]
pub struct CachedPrice {
    pub price: Decimal,
    pub fetched_at: Instant,
    /// Market symbol (or synthetic source label) that produced the price.
    pub source: String,
}

/// Diagnostic view of one cache entry.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryStatus {
    pub symbol: String,
    pub price: Decimal,
    pub age: String,
    pub source: String,
}

/// Process-lifetime price cache with a bounded freshness TTL. Entries past
/// the TTL are kept around as a fallback of last resort.
#[derive(Debug)]
pub struct PriceCache {
    ttl: Duration,
    entries: HashMap<String, CachedPrice>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Look up an entry regardless of age.
    pub fn get(&self, symbol: &str) -> Option<&CachedPrice> {
        self.entries.get(symbol)
    }

    /// Whether an entry is still within the freshness TTL.
    pub fn is_fresh(&self, entry: &CachedPrice) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }

    pub fn insert(&mut self, symbol: &str, price: Decimal, source: &str) {
        self.entries.insert(
            symbol.to_string(),
            CachedPrice {
                price,
                fetched_at: Instant::now(),
                source: source.to_string(),
            },
        );
    }

    /// Drop the entry for one symbol, or every entry when `symbol` is None.
    pub fn clear(&mut self, symbol: Option<&str>) {
        match symbol {
            Some(s) => {
                self.entries.remove(s);
            }
            None => self.entries.clear(),
        }
    }

    /// Snapshot of the cache for diagnostics, sorted by symbol.
    pub fn snapshot(&self) -> Vec<CacheEntryStatus> {
        let mut out: Vec<CacheEntryStatus> = self
            .entries
            .iter()
            .map(|(symbol, entry)| CacheEntryStatus {
                symbol: symbol.clone(),
                price: entry.price,
                age: format_age(entry.fetched_at.elapsed()),
                source: entry.source.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        out
    }
}

/// Render an age as "42s", "3m 12s" or "2h 5m".
pub fn format_age(age: Duration) -> String {
    let seconds = age.as_secs();
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fresh_within_ttl() {
        let mut cache = PriceCache::new(Duration::from_secs(60));
        cache.insert("ETH", dec!(2000), "ETH-USD");

        let entry = cache.get("ETH").unwrap();
        assert!(cache.is_fresh(entry));
        assert_eq!(entry.price, dec!(2000));
    }

    #[test]
    fn test_expired_entry_still_retrievable() {
        let mut cache = PriceCache::new(Duration::ZERO);
        cache.insert("ETH", dec!(2000), "ETH-USD");

        let entry = cache.get("ETH").unwrap();
        assert!(!cache.is_fresh(entry));
        assert_eq!(entry.price, dec!(2000));
    }

    #[test]
    fn test_clear_single_and_all() {
        let mut cache = PriceCache::new(Duration::from_secs(60));
        cache.insert("ETH", dec!(2000), "ETH-USD");
        cache.insert("BTC", dec!(95000), "BTC-USD-PERP");

        cache.clear(Some("ETH"));
        assert!(cache.get("ETH").is_none());
        assert!(cache.get("BTC").is_some());

        cache.clear(None);
        assert!(cache.get("BTC").is_none());
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(42)), "42s");
        assert_eq!(format_age(Duration::from_secs(192)), "3m 12s");
        assert_eq!(format_age(Duration::from_secs(7500)), "2h 5m");
    }
}
