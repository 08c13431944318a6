use axum::{http::StatusCode, routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("consolidate_runs_total", "Criteria consolidations performed.");
        describe_counter!(
            "normalize_products_total",
            "Products normalized from matching responses."
        );
        describe_counter!(
            "enrich_applied_total",
            "Products that received descriptive info."
        );
        describe_histogram!("pipeline_duration_ms", "Full pipeline run time in milliseconds.");
    });
}

/// Install the Prometheus recorder once per process. Later calls reuse the
/// handle; `None` if another recorder was installed first.
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                ensure_metrics_described();
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "prometheus recorder not installed");
                None
            }
        })
        .clone()
}

/// Returns a router exposing `/metrics` with the Prometheus exposition format.
pub fn router() -> Router {
    Router::new().route(
        "/metrics",
        get(|| async {
            match prometheus_handle() {
                Some(h) => (StatusCode::OK, h.render()),
                None => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
            }
        }),
    )
}
