//! Supplier-match service binary entrypoint.
//! Boots the Axum HTTP server around the criteria/matching pipeline.

use anyhow::Context;
use tracing::info;

use supplier_match::api::{router, AppState};
use supplier_match::{config, metrics, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let cfg = config::load_default().context("loading funnel config")?;
    let bind = cfg.server.bind.clone();

    // Install the recorder before the first request touches a counter.
    if metrics::prometheus_handle().is_none() {
        tracing::warn!("metrics disabled: /metrics will return 503");
    }

    let app = router(AppState::new(cfg));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, "supplier-match listening");

    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
