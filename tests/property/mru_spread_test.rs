// tests/property/mru_spread_test.rs

//! Over any K consecutive successful STARTs against a CN set of size >= K
//! where every node fits every workload, each node is chosen at most
//! ⌈K/|CN|⌉ times — the spread property of MRU rotation (§8).

use async_trait::async_trait;
use nebula_scheduler::core::forwarding::NodeKind;
use nebula_scheduler::core::node::{NodeStatus, Telemetry};
use nebula_scheduler::core::payload::{TargetKind, WorkloadRequest};
use nebula_scheduler::core::placement;
use nebula_scheduler::core::registry::{ComputeNodeRegistry, NodeLifecycleFanout};
use proptest::prelude::*;
use std::collections::HashMap;

struct NullFanout;
#[async_trait]
impl NodeLifecycleFanout for NullFanout {
    async fn broadcast_node_connected(&self, _uuid: &str, _kind: NodeKind) {}
    async fn broadcast_node_disconnected(&self, _uuid: &str, _kind: NodeKind) {}
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

    #[test]
    fn picks_spread_within_ceiling(node_count in 1usize..6, starts in 1usize..24) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ComputeNodeRegistry::new();
            let fanout = NullFanout;

            for i in 0..node_count {
                let uuid = format!("n{i}");
                registry.connect(&uuid, &fanout).await;
                let node = registry.get(&uuid).unwrap();
                let mut guard = node.lock().await;
                guard.status = NodeStatus::Ready;
                guard.telemetry = Telemetry {
                    mem_total_mb: 1_000_000,
                    mem_avail_mb: 1_000_000,
                    load: 0.0,
                    cpus_online: 4,
                };
            }

            let mut counts: HashMap<String, usize> = HashMap::new();
            for i in 0..starts {
                let request = WorkloadRequest {
                    instance_uuid: format!("i{i}"),
                    mem_req_mb: 1,
                    target: TargetKind::Compute,
                };
                let mut pick = placement::place_on_compute(&registry, &request)
                    .await
                    .expect("every node always fits this workload");
                placement::apply_speculative_decrement(&mut pick, &request);
                *counts.entry(pick.node.uuid.clone()).or_insert(0) += 1;
            }

            let ceiling = starts.div_ceil(node_count);
            for (_, count) in counts {
                prop_assert!(count <= ceiling);
            }
        });
    }
}
