use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::STABLE_SYMBOL;
use crate::db::portfolio_repo;
use crate::models::{PortfolioPnl, TokenPnl};
use crate::pricing::PriceResolver;

/// Advisory window inside which a PnL refresh counts as "recent".
const PNL_CHECK_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Tracks when the portfolio PnL was last recomputed. Trading paths consult
/// this as a soft guardrail: a stale valuation produces a warning, never a
/// hard failure.
#[derive(Debug)]
pub struct PnlTracker {
    last_check: Mutex<Option<Instant>>,
    window: Duration,
}

impl PnlTracker {
    pub fn new() -> Self {
        Self {
            last_check: Mutex::new(None),
            window: PNL_CHECK_WINDOW,
        }
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            last_check: Mutex::new(None),
            window,
        }
    }

    pub fn record(&self) {
        *self.last_check.lock().unwrap() = Some(Instant::now());
    }

    /// Whether a PnL computation ran within the advisory window.
    pub fn is_recent(&self) -> bool {
        self.last_check
            .lock()
            .unwrap()
            .map(|t| t.elapsed() < self.window)
            .unwrap_or(false)
    }

    /// Seconds since the last recorded check, if any.
    pub fn age_secs(&self) -> Option<u64> {
        self.last_check.lock().unwrap().map(|t| t.elapsed().as_secs())
    }
}

impl Default for PnlTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Recomputes unrealized PnL and allocation share for every held token and
/// persists the refreshed figures back onto the position rows.
pub struct PnlCalculator {
    pool: PgPool,
    resolver: Arc<PriceResolver>,
    tracker: Arc<PnlTracker>,
}

impl PnlCalculator {
    pub fn new(pool: PgPool, resolver: Arc<PriceResolver>, tracker: Arc<PnlTracker>) -> Self {
        Self {
            pool,
            resolver,
            tracker,
        }
    }

    pub async fn compute(&self) -> anyhow::Result<PortfolioPnl> {
        self.tracker.record();
        counter!("pnl_computations_total").increment(1);

        let positions = portfolio_repo::held_positions(&self.pool).await?;

        let mut tokens: Vec<TokenPnl> = Vec::with_capacity(positions.len());
        let mut total_value = Decimal::ZERO;
        let mut total_pnl = Decimal::ZERO;

        for pos in positions {
            let symbol = pos.token_symbol.clone();

            let (current_price, value, pnl, pct) = if symbol == STABLE_SYMBOL {
                (Decimal::ONE, pos.balance, Decimal::ZERO, Decimal::ZERO)
            } else {
                match self.resolver.get_price(&symbol, true).await {
                    Ok(price) => {
                        let value = pos.balance * price;
                        let (pnl, pct) = match pos.entry_price {
                            Some(entry) if entry > Decimal::ZERO => {
                                let pnl = pos.balance * (price - entry);
                                let pct = (price / entry - Decimal::ONE) * Decimal::ONE_HUNDRED;
                                portfolio_repo::update_pnl(&self.pool, &symbol, pnl, pct).await?;
                                (pnl, pct)
                            }
                            _ => (Decimal::ZERO, Decimal::ZERO),
                        };
                        (price, value, pnl, pct)
                    }
                    Err(_) => {
                        // One unpriceable token degrades to its last persisted
                        // figures instead of failing the whole report.
                        tracing::warn!(
                            symbol = %symbol,
                            "Price unresolved, using last persisted PnL"
                        );
                        let pnl = pos.unrealized_pnl;
                        let pct = pos.pnl_percentage;
                        let value = match pos.entry_price {
                            Some(entry) => pos.balance * entry + pnl,
                            None => pos.balance,
                        };
                        let price = if pos.balance > Decimal::ZERO {
                            value / pos.balance
                        } else {
                            Decimal::ZERO
                        };
                        (price, value, pnl, pct)
                    }
                }
            };

            total_value += value;
            total_pnl += pnl;

            tokens.push(TokenPnl {
                token: symbol,
                balance: pos.balance,
                current_price,
                value_usd: value,
                entry_price: pos.entry_price,
                entry_timestamp: pos.entry_timestamp,
                unrealized_pnl: pnl,
                pnl_percentage: pct,
                allocation_percentage: Decimal::ZERO,
            });
        }

        for token in &mut tokens {
            token.allocation_percentage = if total_value > Decimal::ZERO {
                token.value_usd / total_value * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };
        }

        tokens.sort_by(|a, b| b.value_usd.cmp(&a.value_usd));

        let pnl_percentage = overall_pnl_percentage(total_value, total_pnl);

        gauge!("portfolio_total_value").set(total_value.to_f64().unwrap_or(0.0));
        tracing::info!(
            total_value = %total_value,
            total_pnl = %total_pnl,
            pnl_pct = %pnl_percentage,
            tokens = tokens.len(),
            "Portfolio PnL computed"
        );

        Ok(PortfolioPnl {
            total_value,
            total_pnl,
            pnl_percentage,
            tokens,
        })
    }
}

/// Overall PnL relative to the implied initial value (current minus PnL).
/// Degenerate initial values yield 0% rather than a division blowup.
fn overall_pnl_percentage(total_value: Decimal, total_pnl: Decimal) -> Decimal {
    let initial_value = total_value - total_pnl;
    if initial_value > Decimal::ZERO {
        total_pnl / initial_value * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_overall_pnl_percentage() {
        // Value 1100 with 100 profit over an implied 1000 start: +10%.
        assert_eq!(overall_pnl_percentage(dec!(1100), dec!(100)), dec!(10));
        // Flat portfolio.
        assert_eq!(overall_pnl_percentage(dec!(1000), dec!(0)), dec!(0));
        // Degenerate implied initial value.
        assert_eq!(overall_pnl_percentage(dec!(50), dec!(100)), dec!(0));
        assert_eq!(overall_pnl_percentage(dec!(0), dec!(0)), dec!(0));
    }

    #[test]
    fn test_tracker_window() {
        let tracker = PnlTracker::new();
        assert!(!tracker.is_recent());
        assert_eq!(tracker.age_secs(), None);

        tracker.record();
        assert!(tracker.is_recent());
        assert_eq!(tracker.age_secs(), Some(0));
    }

    #[test]
    fn test_tracker_expiry() {
        let tracker = PnlTracker::with_window(Duration::ZERO);
        tracker.record();
        assert!(!tracker.is_recent());
    }
}
