use std::sync::OnceLock;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only the first call installs the global recorder; later calls (several
/// test apps in one process) share its handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Metrics recorder already installed");
            }

            // Pre-register counters so they appear even before the first increment.
            counter!("trades_executed_total").absolute(0);
            counter!("trades_rejected_total").absolute(0);
            counter!("watchlist_alerts_total").absolute(0);
            counter!("quote_refresh_total").absolute(0);
            counter!("quote_refresh_failures").absolute(0);

            gauge!("quotes_live").set(0.0);

            handle
        })
        .clone()
}
