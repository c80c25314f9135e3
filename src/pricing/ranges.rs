use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Sanity bounds for a token's USD price, plus a typical reference value
/// used as a fallback when no live quote can be obtained.
#[derive(Debug, Clone, Copy)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
    pub typical: Decimal,
}

/// Plausibility configuration: per-token reference ranges and a generic
/// ceiling for tokens without one. Constructed once and handed to the
/// resolver, so deployments can override the defaults as quotes drift.
#[derive(Debug, Clone)]
pub struct PriceRanges {
    ranges: HashMap<String, PriceRange>,
    general_ceiling: Decimal,
    /// High-value tokens exempt from the generic ceiling (still must be > 0).
    ceiling_exempt: HashSet<String>,
}

impl Default for PriceRanges {
    fn default() -> Self {
        let mut ranges = HashMap::new();
        let mut add = |symbol: &str, min: Decimal, max: Decimal, typical: Decimal| {
            ranges.insert(symbol.to_string(), PriceRange { min, max, typical });
        };

        add("BTC", Decimal::from(20_000), Decimal::from(200_000), Decimal::from(100_000));
        add("ETH", Decimal::from(1_000), Decimal::from(10_000), Decimal::from(3_000));
        add("SOL", Decimal::from(20), Decimal::from(500), Decimal::from(150));
        add("DOGE", Decimal::new(5, 2), Decimal::ONE, Decimal::new(15, 2));
        add("AVAX", Decimal::from(10), Decimal::from(200), Decimal::from(40));
        add("MATIC", Decimal::new(3, 1), Decimal::from(3), Decimal::new(8, 1));

        Self {
            ranges,
            general_ceiling: Decimal::from(10_000),
            ceiling_exempt: HashSet::from(["BTC".to_string()]),
        }
    }
}

impl PriceRanges {
    /// Add or replace the range for one token.
    pub fn with_range(mut self, symbol: &str, min: Decimal, max: Decimal, typical: Decimal) -> Self {
        self.ranges
            .insert(symbol.to_uppercase(), PriceRange { min, max, typical });
        self
    }

    pub fn range(&self, symbol: &str) -> Option<&PriceRange> {
        self.ranges.get(&symbol.to_uppercase())
    }

    /// Typical reference price for a token, if one is configured.
    pub fn typical(&self, symbol: &str) -> Option<Decimal> {
        self.range(symbol).map(|r| r.typical)
    }

    /// Reject prices outside the configured [min, max] for known tokens, and
    /// non-positive or absurdly large prices for everything else.
    pub fn is_plausible(&self, symbol: &str, price: Decimal) -> bool {
        let symbol = symbol.to_uppercase();

        if let Some(range) = self.ranges.get(&symbol) {
            if price < range.min || price > range.max {
                tracing::warn!(
                    symbol = %symbol,
                    price = %price,
                    min = %range.min,
                    max = %range.max,
                    "Price outside reference range"
                );
                return false;
            }
            return true;
        }

        if price <= Decimal::ZERO {
            return false;
        }
        if price > self.general_ceiling && !self.ceiling_exempt.contains(&symbol) {
            tracing::warn!(
                symbol = %symbol,
                price = %price,
                ceiling = %self.general_ceiling,
                "Price above generic ceiling"
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_known_token_bounds() {
        let ranges = PriceRanges::default();
        assert!(ranges.is_plausible("ETH", dec!(2000)));
        assert!(!ranges.is_plausible("ETH", dec!(999)));
        assert!(!ranges.is_plausible("ETH", dec!(10001)));
        assert!(!ranges.is_plausible("BTC", dec!(19999)));
        assert!(ranges.is_plausible("BTC", dec!(95000)));
    }

    #[test]
    fn test_unknown_token_generic_bounds() {
        let ranges = PriceRanges::default();
        assert!(ranges.is_plausible("UNI", dec!(7.5)));
        assert!(!ranges.is_plausible("UNI", dec!(0)));
        assert!(!ranges.is_plausible("UNI", dec!(-1)));
        assert!(!ranges.is_plausible("UNI", dec!(10001)));
    }

    #[test]
    fn test_ceiling_exemption_applies_to_known_range() {
        // BTC has its own range, so the exemption only matters if the range
        // were removed; a fresh config without a BTC range must still accept
        // six-figure BTC quotes.
        let mut ranges = PriceRanges::default();
        ranges.ranges.remove("BTC");
        assert!(ranges.is_plausible("BTC", dec!(95000)));
        assert!(!ranges.is_plausible("BTC", dec!(0)));
    }

    #[test]
    fn test_with_range_override() {
        let ranges = PriceRanges::default().with_range("eth", dec!(1), dec!(5), dec!(2));
        assert!(ranges.is_plausible("ETH", dec!(3)));
        assert!(!ranges.is_plausible("ETH", dec!(2000)));
    }
}
