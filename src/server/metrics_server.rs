// src/server/metrics_server.rs

//! A small internal HTTP endpoint exposing Prometheus metrics (§11), bound to
//! a port distinct from the scheduler's own transport so scraping never
//! competes with Controller/Agent traffic.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tracing::{error, info};

async fn metrics_handler() -> impl IntoResponse {
    match crate::core::metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!("failed to render metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; version=0.0.4")],
                Vec::new(),
            )
        }
    }
}

pub async fn run(port: u16, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "metrics endpoint listening on /metrics");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.recv().await.ok();
        })
        .await?;
    Ok(())
}
