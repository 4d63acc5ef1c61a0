use anyhow::Context;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_cycles_total", "Pipeline cycles started, per source.");
        describe_counter!(
            "monitor_fetch_errors_total",
            "Failed fetches, per source and error kind."
        );
        describe_counter!(
            "monitor_new_items_total",
            "Items reported as new, per source."
        );
        describe_counter!(
            "monitor_suppressed_items_total",
            "Unseen items recorded silently on a first run."
        );
        describe_counter!(
            "monitor_delivery_errors_total",
            "Alerts the channel failed to deliver."
        );
        describe_counter!(
            "monitor_persist_errors_total",
            "State saves that failed."
        );
        describe_counter!(
            "monitor_cycle_panics_total",
            "Cycles that panicked and were skipped."
        );
        describe_histogram!("monitor_fetch_ms", "Source fetch time in milliseconds.");
        describe_gauge!(
            "monitor_last_success_ts",
            "Unix ts of the last successful cycle, per source."
        );
    });
}

/// Install the Prometheus recorder with its own scrape listener on `addr`.
/// Must be called from inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: install exporter on {addr}"))?;
    ensure_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
