// src/core/dispatch/command.rs

//! Command dispatch (§4.4): role-gates the sender, then routes by opcode.
//! START triggers placement; RESTART/STOP/DELETE/EVACUATE route to the named
//! workload agent; anything else is discarded.

use crate::core::errors::{PlacementError, SchedulerError};
use crate::core::forwarding::{CommandOpcode, ForwardDecision};
use crate::core::payload::{self, LifecyclePayload, StartPayload, TargetKind};
use crate::core::placement::{self, PlacementPick};
use crate::core::registry::{
    ComputeNodeRegistry, ControllerRegistry, GateResult, NetworkNodeRegistry,
};
use std::sync::Arc;
use tracing::{info, warn};

/// What the dispatcher decided, beyond a plain forward/discard. Placement
/// success still needs the winner recorded somewhere (the placement engine
/// already applied the speculative decrement and released its guard by the
/// time this returns); placement failure needs to surface a `StartFailure`
/// back to whoever sent the START, which the transport performs, not the
/// dispatcher (§9, transport decoupling).
pub enum CommandOutcome {
    Forward(ForwardDecision),
    PlacementFailed {
        instance_uuid: String,
        reason: &'static str,
    },
}

pub struct CommandDispatcher {
    compute: Arc<ComputeNodeRegistry>,
    network: Arc<NetworkNodeRegistry>,
    controllers: Arc<ControllerRegistry>,
}

impl CommandDispatcher {
    pub fn new(
        compute: Arc<ComputeNodeRegistry>,
        network: Arc<NetworkNodeRegistry>,
        controllers: Arc<ControllerRegistry>,
    ) -> Self {
        Self {
            compute,
            network,
            controllers,
        }
    }

    /// Dispatches one command frame from `sender_uuid` (§4.4). `sender_uuid`
    /// must gate as a known, MASTER Controller; commands from an unknown
    /// sender or a BACKUP are unauthorized and never reach placement or
    /// forwarding.
    pub async fn dispatch(
        &self,
        sender_uuid: &str,
        opcode: CommandOpcode,
        body: &[u8],
    ) -> Result<CommandOutcome, SchedulerError> {
        match self.controllers.gate(sender_uuid) {
            GateResult::Unknown => {
                return Err(SchedulerError::Unauthorized(sender_uuid.to_string()));
            }
            GateResult::Known { role } if role != crate::core::registry::ControllerRole::Master => {
                return Err(SchedulerError::Unauthorized(sender_uuid.to_string()));
            }
            GateResult::Known { .. } => {}
        }

        match opcode {
            CommandOpcode::Start => self.dispatch_start(body).await,
            CommandOpcode::Restart | CommandOpcode::Stop | CommandOpcode::Delete => {
                self.dispatch_by_agent_uuid(body)
            }
            CommandOpcode::Evacuate => self.dispatch_by_agent_uuid(body),
        }
    }

    async fn dispatch_start(&self, body: &[u8]) -> Result<CommandOutcome, SchedulerError> {
        let start: StartPayload = payload::from_yaml(body)?;
        let instance_uuid = start.instance_uuid.clone();
        let request = start.into_workload_request()?;

        let timer = crate::core::metrics::PLACEMENT_DURATION_SECONDS.start_timer();
        let result = match request.target {
            TargetKind::Compute => placement::place_on_compute(&self.compute, &request)
                .await
                .map(|pick| (pick, request.clone())),
            TargetKind::Network => placement::place_on_network(&self.network, &request)
                .await
                .map(|pick| (pick, request.clone())),
        };
        timer.observe_duration();

        match result {
            Ok((mut pick, request)) => {
                placement::apply_speculative_decrement(&mut pick, &request);
                let PlacementPick { node, guard } = pick;
                drop(guard); // release the node lock; the decrement is already applied.
                info!(
                    instance = %instance_uuid,
                    node = %node.uuid,
                    "placed workload"
                );
                crate::core::metrics::record_placement_outcome("success");
                Ok(CommandOutcome::Forward(ForwardDecision::recipient(
                    node.uuid,
                )))
            }
            Err(err) => {
                warn!(instance = %instance_uuid, reason = err.reason(), "placement failed");
                crate::core::metrics::record_placement_outcome(metric_label(err));
                Ok(CommandOutcome::PlacementFailed {
                    instance_uuid,
                    reason: placement_reason(err),
                })
            }
        }
    }

    fn dispatch_by_agent_uuid(&self, body: &[u8]) -> Result<CommandOutcome, SchedulerError> {
        let lifecycle: LifecyclePayload = payload::from_yaml(body)?;
        match lifecycle.workload_agent_uuid {
            Some(uuid) if !uuid.is_empty() => {
                Ok(CommandOutcome::Forward(ForwardDecision::recipient(uuid)))
            }
            _ => Ok(CommandOutcome::Forward(ForwardDecision::Discard)),
        }
    }
}

fn placement_reason(err: PlacementError) -> &'static str {
    err.reason()
}

fn metric_label(err: PlacementError) -> &'static str {
    match err {
        PlacementError::NoComputeNodes => "no_compute_nodes",
        PlacementError::NoNetworkNodes => "no_network_nodes",
        PlacementError::FullCloud => "full_cloud",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forwarding::NodeKind;
    use crate::core::node::{NodeStatus, Telemetry};
    use async_trait::async_trait;

    struct NullFanout;
    #[async_trait]
    impl crate::core::registry::NodeLifecycleFanout for NullFanout {
        async fn broadcast_node_connected(&self, _uuid: &str, _kind: NodeKind) {}
        async fn broadcast_node_disconnected(&self, _uuid: &str, _kind: NodeKind) {}
    }

    async fn ready_compute(registry: &ComputeNodeRegistry, uuid: &str, mem: u64) {
        let fanout = NullFanout;
        registry.connect(uuid, &fanout).await;
        let node = registry
            .snapshot_order()
            .into_iter()
            .find(|n| n.uuid == uuid)
            .unwrap();
        let mut guard = node.lock().await;
        guard.status = NodeStatus::Ready;
        guard.telemetry = Telemetry {
            mem_total_mb: mem,
            mem_avail_mb: mem,
            load: 0.0,
            cpus_online: 4,
        };
    }

    fn dispatcher(
        compute: Arc<ComputeNodeRegistry>,
        network: Arc<NetworkNodeRegistry>,
        controllers: Arc<ControllerRegistry>,
    ) -> CommandDispatcher {
        CommandDispatcher::new(compute, network, controllers)
    }

    #[tokio::test]
    async fn unauthorized_sender_is_rejected() {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        let d = dispatcher(compute, network, controllers);

        let err = d
            .dispatch("ghost-controller", CommandOpcode::Start, b"InstanceUUID: i1\nRequestedResources: []\n")
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn backup_controller_is_rejected() {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        controllers.connect("c1"); // master
        controllers.connect("c2"); // backup
        ready_compute(&compute, "cn1", 1024).await;

        let d = dispatcher(compute.clone(), network, controllers);
        let body = b"InstanceUUID: i1\nRequestedResources:\n  - Type: MemMB\n    Value: 512\n";
        let err = d.dispatch("c2", CommandOpcode::Start, body).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized(_)));

        // no node state mutated by the rejected sender.
        let node = compute.get("cn1").unwrap();
        assert_eq!(node.lock().await.telemetry.mem_avail_mb, 1024);
    }

    #[tokio::test]
    async fn start_places_and_returns_recipient() {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        controllers.connect("c1");
        ready_compute(&compute, "cn1", 1024).await;

        let d = dispatcher(compute, network, controllers);
        let body = b"InstanceUUID: i1\nRequestedResources:\n  - Type: MemMB\n    Value: 512\n";
        let outcome = d.dispatch("c1", CommandOpcode::Start, body).await.unwrap();
        match outcome {
            CommandOutcome::Forward(ForwardDecision::Recipient(uuid)) => assert_eq!(uuid, "cn1"),
            _ => panic!("expected a recipient forward"),
        }
    }

    #[tokio::test]
    async fn start_with_no_compute_nodes_reports_placement_failure() {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        controllers.connect("c1");

        let d = dispatcher(compute, network, controllers);
        let body = b"InstanceUUID: i1\nRequestedResources:\n  - Type: MemMB\n    Value: 512\n";
        let outcome = d.dispatch("c1", CommandOpcode::Start, body).await.unwrap();
        match outcome {
            CommandOutcome::PlacementFailed { instance_uuid, reason } => {
                assert_eq!(instance_uuid, "i1");
                assert_eq!(reason, "NoComputeNodes");
            }
            _ => panic!("expected a placement failure"),
        }
    }

    #[tokio::test]
    async fn stop_routes_by_workload_agent_uuid() {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        controllers.connect("c1");

        let d = dispatcher(compute, network, controllers);
        let body = b"InstanceUUID: i1\nWorkloadAgentUUID: cn1\n";
        let outcome = d.dispatch("c1", CommandOpcode::Stop, body).await.unwrap();
        match outcome {
            CommandOutcome::Forward(ForwardDecision::Recipient(uuid)) => assert_eq!(uuid, "cn1"),
            _ => panic!("expected a recipient forward"),
        }
    }

    #[tokio::test]
    async fn stop_without_agent_uuid_is_discarded() {
        let compute = Arc::new(ComputeNodeRegistry::new());
        let network = Arc::new(NetworkNodeRegistry::new());
        let controllers = Arc::new(ControllerRegistry::new());
        controllers.connect("c1");

        let d = dispatcher(compute, network, controllers);
        let body = b"InstanceUUID: i1\n";
        let outcome = d.dispatch("c1", CommandOpcode::Stop, body).await.unwrap();
        match outcome {
            CommandOutcome::Forward(ForwardDecision::Discard) => {}
            _ => panic!("expected a discard"),
        }
    }
}
