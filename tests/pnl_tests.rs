mod common;

use rust_decimal_macros::dec;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use common::StaticGateway;
use paperfolio::config::STABLE_SYMBOL;
use paperfolio::db::portfolio_repo;
use paperfolio::portfolio::{PnlCalculator, PnlTracker, TradeSimulator};
use paperfolio::pricing::{MarketRegistry, PriceResolver};

fn resolver(gateway: Arc<StaticGateway>) -> Arc<PriceResolver> {
    Arc::new(
        PriceResolver::new(gateway, Arc::new(MarketRegistry::new()))
            .with_retry(1, Duration::ZERO),
    )
}

fn calculator(pool: PgPool, gateway: Arc<StaticGateway>) -> (PnlCalculator, Arc<PnlTracker>) {
    let tracker = Arc::new(PnlTracker::new());
    (
        PnlCalculator::new(pool, resolver(gateway), tracker.clone()),
        tracker,
    )
}

#[tokio::test]
async fn test_stable_only_portfolio_has_zero_pnl() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    let (calc, tracker) = calculator(pool, StaticGateway::new(&[]));
    assert!(!tracker.is_recent());

    let report = calc.compute().await.unwrap();
    assert_eq!(report.total_value, dec!(1000));
    assert_eq!(report.total_pnl, dec!(0));
    assert_eq!(report.pnl_percentage, dec!(0));
    assert_eq!(report.tokens.len(), 1);
    assert_eq!(report.tokens[0].token, STABLE_SYMBOL);
    assert_eq!(report.tokens[0].allocation_percentage, dec!(100));

    // Computing PnL arms the freshness gate.
    assert!(tracker.is_recent());
}

#[tokio::test]
async fn test_pnl_refresh_persists_onto_rows() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    // Acquire 0.25 ETH at 2000.
    {
        let registry = Arc::new(MarketRegistry::new());
        let resolver = Arc::new(
            PriceResolver::new(StaticGateway::new(&[("ETH-USD-PERP", "2000")]), registry.clone())
                .with_retry(1, Duration::ZERO),
        );
        let tracker = Arc::new(PnlTracker::new());
        tracker.record();
        let sim = TradeSimulator::new(pool.clone(), resolver, registry, tracker, None);
        sim.trade(STABLE_SYMBOL, "ETH", dec!(500), None).await.unwrap();
    }

    // ETH rallies to 2500.
    let (calc, _) = calculator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "2500")]));
    let report = calc.compute().await.unwrap();

    assert_eq!(report.total_value, dec!(1125)); // 500 USDC + 0.25·2500
    assert_eq!(report.total_pnl, dec!(125));
    assert_eq!(report.pnl_percentage, dec!(12.5));

    // Sorted by value descending: ETH (625) ahead of USDC (500).
    assert_eq!(report.tokens[0].token, "ETH");
    assert_eq!(report.tokens[0].unrealized_pnl, dec!(125));
    assert_eq!(report.tokens[0].pnl_percentage, dec!(25));

    // Refreshed figures are persisted onto the position row.
    let eth = portfolio_repo::get_position(&pool, "ETH").await.unwrap().unwrap();
    assert_eq!(eth.unrealized_pnl, dec!(125));
    assert_eq!(eth.pnl_percentage, dec!(25));
}

#[tokio::test]
async fn test_unpriceable_token_degrades_gracefully() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    // Acquire ETH, refresh PnL at 2500 so figures are persisted.
    {
        let registry = Arc::new(MarketRegistry::new());
        let resolver = Arc::new(
            PriceResolver::new(StaticGateway::new(&[("ETH-USD-PERP", "2000")]), registry.clone())
                .with_retry(1, Duration::ZERO),
        );
        let tracker = Arc::new(PnlTracker::new());
        tracker.record();
        let sim = TradeSimulator::new(pool.clone(), resolver, registry, tracker, None);
        sim.trade(STABLE_SYMBOL, "ETH", dec!(500), None).await.unwrap();
    }
    let (calc, _) = calculator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "2500")]));
    calc.compute().await.unwrap();

    // Now every quote fails. ETH has a typical reference price, so the
    // resolver still produces a value; the report must not error either way.
    let (calc, _) = calculator(pool.clone(), StaticGateway::new(&[]));
    let report = calc.compute().await.unwrap();
    assert_eq!(report.tokens.len(), 2);
    let eth = report.tokens.iter().find(|t| t.token == "ETH").unwrap();
    assert!(eth.value_usd > dec!(0));
}
