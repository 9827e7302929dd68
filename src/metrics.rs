use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder once; later calls reuse the first handle
pub fn init_metrics() -> Result<PrometheusHandle> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")
        })
        .cloned()
}

/// Background task to update process metrics
pub async fn process_metrics_task() {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

/// Metrics shared by both bridge commands
fn initialize_common_metrics() {
    metrics::gauge!("dwm.mqtt.connected").set(0.0);
    metrics::counter!("dwm.mqtt.disconnects_total").absolute(0);
}

/// Initialize `log-to-mqtt` metrics to zero
/// This ensures metrics always appear in Prometheus queries even if no events have occurred
pub fn initialize_publish_metrics() {
    initialize_common_metrics();
    metrics::counter!("dwm.follower.lines_read_total").absolute(0);
    metrics::counter!("dwm.follower.truncations_total").absolute(0);
    metrics::counter!("dwm.follower.rotations_total").absolute(0);
    metrics::counter!("dwm.publish.lines_skipped_total").absolute(0);
    metrics::counter!("dwm.mqtt.lines_published_total").absolute(0);
    metrics::counter!("dwm.mqtt.lines_dropped_total").absolute(0);
}

/// Initialize `mqtt-to-terminal` metrics to zero
pub fn initialize_subscribe_metrics() {
    initialize_common_metrics();
    metrics::counter!("dwm.mqtt.messages_received_total").absolute(0);
    metrics::counter!("dwm.pipeline.packets_decoded_total").absolute(0);
    metrics::counter!("dwm.pipeline.packets_undecodable_total").absolute(0);
    metrics::counter!("dwm.format.bearing_errors_total").absolute(0);
    metrics::counter!("dwm.terminal.summaries_rendered_total").absolute(0);
}

fn router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}

/// Serve `/metrics` on the given port until the process exits
pub async fn start_metrics_server(port: u16) -> Result<()> {
    let handle = init_metrics()?;

    tokio::spawn(process_metrics_task());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting metrics server on http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", addr))?;

    axum::serve(listener, router(handle))
        .await
        .context("Metrics server failed")
}
