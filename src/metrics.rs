use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Pre-register counters so they appear even before the first increment.
    counter!("price_lookups_total").absolute(0);
    counter!("price_cache_hits_total").absolute(0);
    counter!("price_candidates_rejected_total").absolute(0);
    counter!("trades_executed_total").absolute(0);
    counter!("trades_rejected_total").absolute(0);
    counter!("pnl_computations_total").absolute(0);
    counter!("reports_sent_total").absolute(0);

    // Pre-register gauges at zero.
    gauge!("portfolio_total_value").set(0.0);

    handle
}
