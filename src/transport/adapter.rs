// src/transport/adapter.rs

//! `TransportEventSink`: the concrete `EventSink` the transport hands to
//! `SchedulerState` so core logic can ask for a frame to be sent without ever
//! importing `PeerDirectory` or `Frame` itself.

use crate::core::forwarding::NodeKind;
use crate::core::payload::{self, NodeLifecycleEventPayload};
use crate::core::registry::ControllerRegistry;
use crate::core::state::EventSink;
use crate::transport::wire::Frame;
use crate::transport::PeerDirectory;
use async_trait::async_trait;
use std::sync::Arc;

pub struct TransportEventSink {
    directory: Arc<PeerDirectory>,
    controllers: Arc<ControllerRegistry>,
}

impl TransportEventSink {
    pub fn new(directory: Arc<PeerDirectory>, controllers: Arc<ControllerRegistry>) -> Self {
        Self {
            directory,
            controllers,
        }
    }

    /// Broadcasts `frame` to every currently-connected Controller (§4.5's
    /// declarative pure-fan-out table, and NodeConnected/NodeDisconnected).
    pub fn broadcast_to_controllers(&self, frame_for: impl Fn() -> Frame) {
        for uuid in self.controllers.all_uuids() {
            self.directory.send_to(&uuid, frame_for());
        }
    }
}

#[async_trait]
impl EventSink for TransportEventSink {
    async fn send_node_lifecycle_event(&self, node_uuid: &str, node_kind: NodeKind, connected: bool) {
        let payload = NodeLifecycleEventPayload {
            node_uuid: node_uuid.to_string(),
            node_type: node_kind.wire_name().to_string(),
        };
        let body = payload::to_yaml(&payload);
        let opcode = if connected {
            "NodeConnected"
        } else {
            "NodeDisconnected"
        };

        self.broadcast_to_controllers(|| Frame::event(opcode, "scheduler", body.clone()));
    }
}
