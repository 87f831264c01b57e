// src/core/registry/mod.rs

//! The three connection/role registries (§3, §4.1, §4.2): independent collections
//! for Compute Nodes, Network Nodes, and Controllers.

pub mod compute;
pub mod controller;
pub mod network;

pub use compute::ComputeNodeRegistry;
pub use controller::{Controller, ControllerRegistry, ControllerRole, GateResult};
pub use network::NetworkNodeRegistry;

use crate::core::forwarding::NodeKind;
use async_trait::async_trait;

/// Fan-out hook invoked by the CN/NN registries after a connect or disconnect
/// mutation has completed and the registry's writer lock has been released
/// (§4.1, §4.5, lock discipline in §5: "this is always after releasing any
/// writer on other registries").
#[async_trait]
pub trait NodeLifecycleFanout: Send + Sync {
    async fn broadcast_node_connected(&self, uuid: &str, kind: NodeKind);
    async fn broadcast_node_disconnected(&self, uuid: &str, kind: NodeKind);
}
