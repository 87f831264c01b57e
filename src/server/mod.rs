// src/server/mod.rs

//! Process-level orchestration: turn a loaded [`Config`] into a running
//! scheduler. None of this is part of the core (§1, "process bootstrap...
//! thin shell duties") — it wires the transport, the metrics endpoint, and
//! the heartbeat log line around [`crate::core::state::SchedulerState`].

mod context;
mod heartbeat;
mod initialization;
mod metrics_server;

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, reload};

/// Starts the scheduler and runs until a shutdown signal is received.
pub async fn run(
    config: Config,
    _log_reload_handle: Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>,
) -> Result<()> {
    let ctx = initialization::setup(config).await?;

    let mut tasks = tokio::task::JoinSet::new();

    if ctx.config.heartbeat_interval_secs > 0 {
        tasks.spawn(heartbeat::run(
            ctx.state.clone(),
            ctx.config.heartbeat_interval_secs,
            ctx.shutdown_tx.subscribe(),
        ));
    }

    tasks.spawn(metrics_server::run(
        ctx.config.metrics_port,
        ctx.shutdown_tx.subscribe(),
    ));

    info!(
        host = %ctx.config.host,
        port = ctx.config.port,
        tls = ctx.acceptor.is_some(),
        "scheduler transport listening"
    );

    tokio::select! {
        biased;

        _ = await_shutdown_signal() => {
            info!("shutdown signal received");
        }

        () = crate::transport::listener::serve(
            ctx.listener,
            ctx.acceptor,
            ctx.state.clone(),
            ctx.directory.clone(),
            ctx.connection_permits.clone(),
            ctx.shutdown_tx.clone(),
        ) => {}
    }

    let _ = ctx.shutdown_tx.send(());
    tasks.shutdown().await;
    info!("scheduler shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn await_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}

#[cfg(windows)]
async fn await_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl-C");
}
