// src/core/metrics.rs

//! Prometheus metrics (§11). A separate HTTP server exposes these on
//! `metrics_port`, distinct from the scheduler's own transport port, so
//! metrics scraping never competes with Controller/Agent traffic.

use crate::core::forwarding::NodeKind;
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};

lazy_static! {
    pub static ref CONNECTED_CONTROLLERS: Gauge = register_gauge!(
        "nebula_scheduler_connected_controllers",
        "Number of currently connected Controllers"
    )
    .unwrap();
    pub static ref CONNECTED_COMPUTE_NODES: Gauge = register_gauge!(
        "nebula_scheduler_connected_compute_nodes",
        "Number of currently connected Compute Nodes"
    )
    .unwrap();
    pub static ref CONNECTED_NETWORK_NODES: Gauge = register_gauge!(
        "nebula_scheduler_connected_network_nodes",
        "Number of currently connected Network Nodes"
    )
    .unwrap();
    pub static ref PLACEMENTS_TOTAL: CounterVec = register_counter_vec!(
        "nebula_scheduler_placements_total",
        "Placement attempts by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref COMMANDS_FORWARDED_TOTAL: Counter = register_counter!(
        "nebula_scheduler_commands_forwarded_total",
        "Commands forwarded to a recipient"
    )
    .unwrap();
    pub static ref COMMANDS_DISCARDED_TOTAL: Counter = register_counter!(
        "nebula_scheduler_commands_discarded_total",
        "Commands discarded by the dispatcher"
    )
    .unwrap();
    pub static ref EVENTS_FORWARDED_TOTAL: Counter = register_counter!(
        "nebula_scheduler_events_forwarded_total",
        "Events forwarded to a recipient"
    )
    .unwrap();
    pub static ref CONTROLLER_PROMOTIONS_TOTAL: Counter = register_counter!(
        "nebula_scheduler_controller_promotions_total",
        "Backup-to-Master Controller promotions"
    )
    .unwrap();
    pub static ref PLACEMENT_DURATION_SECONDS: Histogram = register_histogram!(
        "nebula_scheduler_placement_duration_seconds",
        "Time spent scanning for a placement candidate"
    )
    .unwrap();
}

pub fn record_node_connected(kind: NodeKind) {
    match kind {
        NodeKind::Compute => CONNECTED_COMPUTE_NODES.inc(),
        NodeKind::Network => CONNECTED_NETWORK_NODES.inc(),
    }
}

pub fn record_node_disconnected(kind: NodeKind) {
    match kind {
        NodeKind::Compute => CONNECTED_COMPUTE_NODES.dec(),
        NodeKind::Network => CONNECTED_NETWORK_NODES.dec(),
    }
}

pub fn record_placement_outcome(outcome: &str) {
    PLACEMENTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Renders the current metric family set in the Prometheus text exposition
/// format, for the `/metrics` HTTP handler (§11).
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(buffer)
}
