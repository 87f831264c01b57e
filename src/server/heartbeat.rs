// src/server/heartbeat.rs

//! An informational heartbeat log line listing registry sizes (§10),
//! disabled when `heartbeat_interval_secs` is `0`.

use crate::core::state::SchedulerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

pub async fn run(
    state: Arc<SchedulerState>,
    interval_secs: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.tick().await; // first tick fires immediately; skip it.

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => return Ok(()),
            _ = ticker.tick() => {
                info!(
                    controllers = state.controllers.len(),
                    compute_nodes = state.compute.len(),
                    network_nodes = state.network.len(),
                    "heartbeat"
                );
            }
        }
    }
}
