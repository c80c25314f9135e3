use metrics::counter;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::STABLE_SYMBOL;
use crate::db::{portfolio_repo, trade_repo};
use crate::models::Side;
use crate::portfolio::pnl::PnlTracker;
use crate::pricing::{MarketRegistry, PriceResolver};
use crate::services::Reporter;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("trade amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("no {0} position in portfolio; initialize or fund it first")]
    MissingPosition(String),

    #[error("not enough {symbol}: current balance = {balance}, requested = {requested}")]
    InsufficientBalance {
        symbol: String,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("token {symbol} is not tradable: {reason}")]
    UnsupportedToken { symbol: String, reason: String },

    #[error("could not get a valid price for {0}; trading is not possible without pricing data")]
    UnresolvedPrice(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Outcome of a committed simulated trade.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub from_token: String,
    pub to_token: String,
    pub from_amount: Decimal,
    pub to_amount: Decimal,
    /// USD value of the intermediate leg.
    pub usd_value: Decimal,
    /// Execution price of the destination token (1.0 for the stablecoin).
    pub price: Decimal,
    pub message: String,
}

/// Executes two-leg conversions (source token → USD → destination token)
/// against the ledger. Both prices are resolved force-fresh before any
/// mutation, and the debit, credit and trade record commit atomically.
pub struct TradeSimulator {
    pool: PgPool,
    resolver: Arc<PriceResolver>,
    registry: Arc<MarketRegistry>,
    tracker: Arc<PnlTracker>,
    reporter: Option<Arc<Reporter>>,
}

impl TradeSimulator {
    pub fn new(
        pool: PgPool,
        resolver: Arc<PriceResolver>,
        registry: Arc<MarketRegistry>,
        tracker: Arc<PnlTracker>,
        reporter: Option<Arc<Reporter>>,
    ) -> Self {
        Self {
            pool,
            resolver,
            registry,
            tracker,
            reporter,
        }
    }

    pub async fn trade(
        &self,
        from_token: &str,
        to_token: &str,
        from_amount: Decimal,
        explanation: Option<&str>,
    ) -> Result<TradeReceipt, TradeError> {
        let from = from_token.to_uppercase();
        let to = to_token.to_uppercase();

        if from_amount <= Decimal::ZERO {
            return Err(TradeError::NonPositiveAmount(from_amount));
        }

        // Advisory guardrail: valuations should be fresh when trading.
        if !self.tracker.is_recent() {
            tracing::warn!(
                age_secs = ?self.tracker.age_secs(),
                "PnL has not been refreshed recently; trading on stale valuations"
            );
        }

        let position = portfolio_repo::get_position(&self.pool, &from)
            .await?
            .ok_or_else(|| TradeError::MissingPosition(from.clone()))?;

        if position.balance < from_amount {
            return Err(TradeError::InsufficientBalance {
                symbol: from,
                balance: position.balance,
                requested: from_amount,
            });
        }

        // Both legs must be tradable before the ledger is touched.
        for symbol in [&from, &to] {
            if *symbol != STABLE_SYMBOL {
                let support = self.registry.is_supported(symbol).await;
                if !support.supported {
                    return Err(TradeError::UnsupportedToken {
                        symbol: symbol.clone(),
                        reason: support.message,
                    });
                }
            }
        }

        // Resolve both prices force-fresh before any mutation. Either leg
        // failing aborts the trade with no partial state change.
        let from_price = if from == STABLE_SYMBOL {
            Decimal::ONE
        } else {
            self.resolver
                .get_price(&from, true)
                .await
                .map_err(|_| TradeError::UnresolvedPrice(from.clone()))?
        };
        let usd_value = from_amount * from_price;

        let to_price = if to == STABLE_SYMBOL {
            Decimal::ONE
        } else {
            self.resolver
                .get_price(&to, true)
                .await
                .map_err(|_| TradeError::UnresolvedPrice(to.clone()))?
        };
        let to_amount = usd_value / to_price;

        // Debit, credit and trade record commit or roll back together.
        // Note from == to is allowed and nets out to a no-op modulo rounding.
        let mut tx = self.pool.begin().await?;

        let debited = portfolio_repo::debit(&mut tx, &from, from_amount).await?;
        if debited.is_none() {
            tx.rollback().await?;
            return Err(TradeError::InsufficientBalance {
                symbol: from,
                balance: position.balance,
                requested: from_amount,
            });
        }

        portfolio_repo::credit(&mut tx, &to, to_amount, to_price).await?;

        let external_id = format!("sim-{}", Uuid::new_v4());
        if to == STABLE_SYMBOL {
            // Single leg: selling straight into the stablecoin.
            trade_repo::append_trade(
                &mut tx,
                &format!("{from}-USD-PERP"),
                Side::Sell,
                from_amount,
                from_price,
                Some(&external_id),
            )
            .await?;
        } else {
            // One combined swap record; the price is the cross rate.
            trade_repo::append_trade(
                &mut tx,
                &format!("{from}/{to}-SWAP"),
                Side::Swap,
                from_amount,
                from_price / to_price,
                Some(&external_id),
            )
            .await?;
        }

        tx.commit().await?;
        counter!("trades_executed_total").increment(1);

        let message = if to == STABLE_SYMBOL {
            format!(
                "Sold {from_amount} {from} => got {usd_value:.4} {STABLE_SYMBOL} (no second leg needed)"
            )
        } else {
            format!(
                "Traded {from_amount} {from} => got {usd_value:.4} {STABLE_SYMBOL} => bought {to_amount:.6} {to} @ price {to_price:.2} {STABLE_SYMBOL}"
            )
        };

        tracing::info!(
            from = %from,
            to = %to,
            amount = %from_amount,
            usd = %usd_value,
            "Trade executed"
        );

        let receipt = TradeReceipt {
            from_token: from,
            to_token: to,
            from_amount,
            to_amount,
            usd_value,
            price: to_price,
            message,
        };

        if let Some(reporter) = &self.reporter {
            reporter
                .report_trade(&receipt, explanation.unwrap_or("No explanation provided"))
                .await;
        }

        Ok(receipt)
    }
}
