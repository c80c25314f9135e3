mod common;

use rust_decimal_macros::dec;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use common::StaticGateway;
use paperfolio::config::STABLE_SYMBOL;
use paperfolio::db::{portfolio_repo, trade_repo};
use paperfolio::portfolio::{PnlTracker, TradeError, TradeSimulator};
use paperfolio::pricing::{MarketRegistry, PriceResolver};

fn simulator(pool: PgPool, gateway: Arc<StaticGateway>) -> TradeSimulator {
    let registry = Arc::new(MarketRegistry::new());
    let resolver = Arc::new(
        PriceResolver::new(gateway, registry.clone()).with_retry(1, Duration::ZERO),
    );
    let tracker = Arc::new(PnlTracker::new());
    tracker.record();
    TradeSimulator::new(pool, resolver, registry, tracker, None)
}

#[tokio::test]
async fn test_stable_to_token_trade_flow() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    let sim = simulator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "2000")]));
    let receipt = sim
        .trade(STABLE_SYMBOL, "ETH", dec!(500), Some("rotate into ETH"))
        .await
        .unwrap();

    assert_eq!(receipt.to_amount, dec!(0.25));
    assert_eq!(receipt.usd_value, dec!(500));

    let eth = portfolio_repo::get_position(&pool, "ETH").await.unwrap().unwrap();
    assert_eq!(eth.balance, dec!(0.25));
    assert_eq!(eth.entry_price, Some(dec!(2000)));
    assert!(eth.entry_timestamp.is_some());

    let usdc = portfolio_repo::get_position(&pool, STABLE_SYMBOL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usdc.balance, dec!(500));

    let trades = trade_repo::recent_trades(&pool, 8).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].side, "SWAP");
    assert_eq!(trades[0].market, "USDC/ETH-SWAP");
}

#[tokio::test]
async fn test_weighted_entry_price_across_buys() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(2000)).await.unwrap();

    // First buy: 500 USDC at 2000 → 0.25 ETH.
    let sim = simulator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "2000")]));
    sim.trade(STABLE_SYMBOL, "ETH", dec!(500), None).await.unwrap();

    // Second buy at a higher price: 750 USDC at 3000 → 0.25 ETH.
    let sim = simulator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "3000")]));
    sim.trade(STABLE_SYMBOL, "ETH", dec!(750), None).await.unwrap();

    // (0.25·2000 + 0.25·3000) / 0.5 = 2500
    let eth = portfolio_repo::get_position(&pool, "ETH").await.unwrap().unwrap();
    assert_eq!(eth.balance, dec!(0.5));
    assert_eq!(eth.entry_price, Some(dec!(2500)));

    let first_acquired = eth.entry_timestamp.expect("entry timestamp set");

    // Entry timestamp survives the top-up.
    let sim = simulator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "3000")]));
    sim.trade(STABLE_SYMBOL, "ETH", dec!(150), None).await.unwrap();
    let eth = portfolio_repo::get_position(&pool, "ETH").await.unwrap().unwrap();
    assert_eq!(eth.entry_timestamp, Some(first_acquired));
}

#[tokio::test]
async fn test_sell_to_stable_records_single_leg() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    let sim = simulator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "2000")]));
    sim.trade(STABLE_SYMBOL, "ETH", dec!(500), None).await.unwrap();
    sim.trade("ETH", STABLE_SYMBOL, dec!(0.1), Some("take profit"))
        .await
        .unwrap();

    let eth = portfolio_repo::get_position(&pool, "ETH").await.unwrap().unwrap();
    assert_eq!(eth.balance, dec!(0.15));

    let usdc = portfolio_repo::get_position(&pool, STABLE_SYMBOL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usdc.balance, dec!(700));

    let trades = trade_repo::recent_trades(&pool, 8).await.unwrap();
    assert_eq!(trades[0].side, "SELL");
    assert_eq!(trades[0].market, "ETH-USD-PERP");
    assert_eq!(trades[0].price, dec!(2000));
}

#[tokio::test]
async fn test_insufficient_balance_rejected_before_mutation() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(100)).await.unwrap();

    let sim = simulator(pool.clone(), StaticGateway::new(&[("ETH-USD-PERP", "2000")]));
    let err = sim
        .trade(STABLE_SYMBOL, "ETH", dec!(500), None)
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::InsufficientBalance { .. }));
    let msg = err.to_string();
    assert!(msg.contains("100"));
    assert!(msg.contains("500"));

    // No partial state: balance untouched, no ETH row, no trade record.
    let usdc = portfolio_repo::get_position(&pool, STABLE_SYMBOL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usdc.balance, dec!(100));
    assert!(portfolio_repo::get_position(&pool, "ETH").await.unwrap().is_none());
    assert!(trade_repo::recent_trades(&pool, 8).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unresolved_price_aborts_without_mutation() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    // No quotes at all: UNI is in the fallback supported list but has no
    // reference range, so resolution fails outright.
    let sim = simulator(pool.clone(), StaticGateway::new(&[]));
    let err = sim
        .trade(STABLE_SYMBOL, "UNI", dec!(100), None)
        .await
        .unwrap_err();

    assert!(matches!(err, TradeError::UnresolvedPrice(ref s) if s == "UNI"));

    let usdc = portfolio_repo::get_position(&pool, STABLE_SYMBOL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usdc.balance, dec!(1000));
    assert!(trade_repo::recent_trades(&pool, 8).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_uncommitted_debit_rolls_back() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(1000)).await.unwrap();

    // Debit inside a transaction that is dropped without commit.
    {
        let mut tx = pool.begin().await.unwrap();
        let debited = portfolio_repo::debit(&mut tx, STABLE_SYMBOL, dec!(400))
            .await
            .unwrap();
        assert_eq!(debited.unwrap().balance, dec!(600));
    }

    let usdc = portfolio_repo::get_position(&pool, STABLE_SYMBOL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usdc.balance, dec!(1000));
}

#[tokio::test]
async fn test_guarded_debit_never_goes_negative() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    portfolio_repo::reset_portfolio(&pool, dec!(50)).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let debited = portfolio_repo::debit(&mut tx, STABLE_SYMBOL, dec!(51))
        .await
        .unwrap();
    assert!(debited.is_none());
    tx.rollback().await.unwrap();
}
