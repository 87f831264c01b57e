// src/core/state.rs

//! `SchedulerState`: the process-wide bundle of registries and dispatch logic
//! (§3, §4). Owned once by the server, shared with every connection handler
//! behind an `Arc`.

use crate::core::dispatch::{CommandDispatcher, EventForwarder};
use crate::core::forwarding::NodeKind;
use crate::core::metrics;
use crate::core::registry::{ComputeNodeRegistry, ControllerRegistry, NetworkNodeRegistry, NodeLifecycleFanout};
use async_trait::async_trait;
use std::sync::Arc;

/// Narrow sink the scheduler core calls into to actually deliver a frame,
/// implemented by the transport layer (§9, "transport decoupling": core logic
/// never touches a socket directly).
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send_node_lifecycle_event(&self, node_uuid: &str, node_kind: NodeKind, connected: bool);
}

pub struct SchedulerState {
    pub compute: Arc<ComputeNodeRegistry>,
    pub network: Arc<NetworkNodeRegistry>,
    pub controllers: Arc<ControllerRegistry>,
    pub dispatcher: CommandDispatcher,
    pub events: EventForwarder,
    sink: Arc<dyn EventSink>,
}

impl SchedulerState {
    pub fn new(sink: Arc<dyn EventSink>) -> Arc<Self> {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        let dispatcher = CommandDispatcher::new(compute.clone(), network.clone(), controllers.clone());

        Arc::new(Self {
            compute,
            network,
            controllers,
            dispatcher,
            events: EventForwarder::new(),
            sink,
        })
    }
}

#[async_trait]
impl NodeLifecycleFanout for SchedulerState {
    async fn broadcast_node_connected(&self, uuid: &str, kind: NodeKind) {
        metrics::record_node_connected(kind);
        self.sink.send_node_lifecycle_event(uuid, kind, true).await;
    }

    async fn broadcast_node_disconnected(&self, uuid: &str, kind: NodeKind) {
        metrics::record_node_disconnected(kind);
        self.sink.send_node_lifecycle_event(uuid, kind, false).await;
    }
}
