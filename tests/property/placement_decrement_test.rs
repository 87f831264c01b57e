// tests/property/placement_decrement_test.rs

//! After a successful START, the chosen node's pre-decrement memAvailMB was
//! >= memReqMB and the post-decrement value equals pre - memReqMB. A
//! subsequent READY from that node overwrites its telemetry exactly,
//! irrespective of any prior speculative decrements (§8).

use async_trait::async_trait;
use nebula_scheduler::core::forwarding::NodeKind;
use nebula_scheduler::core::node::{NodeStatus, Telemetry};
use nebula_scheduler::core::payload::{ReadyPayload, TargetKind, WorkloadRequest};
use nebula_scheduler::core::placement;
use nebula_scheduler::core::registry::{ComputeNodeRegistry, NodeLifecycleFanout};
use proptest::prelude::*;

struct NullFanout;
#[async_trait]
impl NodeLifecycleFanout for NullFanout {
    async fn broadcast_node_connected(&self, _uuid: &str, _kind: NodeKind) {}
    async fn broadcast_node_disconnected(&self, _uuid: &str, _kind: NodeKind) {}
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, ..ProptestConfig::default() })]

    #[test]
    fn decrement_matches_pre_minus_requested(mem_avail in 1u64..100_000, mem_req in 1u64..100_000) {
        prop_assume!(mem_req <= mem_avail);
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ComputeNodeRegistry::new();
            let fanout = NullFanout;
            registry.connect("n1", &fanout).await;
            let node = registry.get("n1").unwrap();
            {
                let mut guard = node.lock().await;
                guard.status = NodeStatus::Ready;
                guard.telemetry = Telemetry {
                    mem_total_mb: mem_avail,
                    mem_avail_mb: mem_avail,
                    load: 0.0,
                    cpus_online: 4,
                };
            }

            let request = WorkloadRequest {
                instance_uuid: "i1".to_string(),
                mem_req_mb: mem_req,
                target: TargetKind::Compute,
            };

            let mut pick = placement::place_on_compute(&registry, &request)
                .await
                .expect("mem_req <= mem_avail guarantees a fit");
            let pre = pick.guard.telemetry.mem_avail_mb;
            prop_assert!(pre >= mem_req);

            placement::apply_speculative_decrement(&mut pick, &request);
            let post = pick.guard.telemetry.mem_avail_mb;
            prop_assert_eq!(post, pre - mem_req);
        });
    }

    #[test]
    fn ready_overwrites_any_prior_speculation(
        mem_avail in 1u64..100_000,
        decrements in prop::collection::vec(1u64..1000, 0..10),
        reported_total in 1u64..100_000,
        reported_avail in 0u64..100_000,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ComputeNodeRegistry::new();
            let fanout = NullFanout;
            registry.connect("n1", &fanout).await;
            let node = registry.get("n1").unwrap();
            {
                let mut guard = node.lock().await;
                guard.status = NodeStatus::Ready;
                guard.telemetry = Telemetry {
                    mem_total_mb: mem_avail,
                    mem_avail_mb: mem_avail,
                    load: 0.0,
                    cpus_online: 4,
                };
            }

            for amount in &decrements {
                let mut guard = node.lock().await;
                guard.telemetry.mem_avail_mb = guard.telemetry.mem_avail_mb.saturating_sub(*amount);
            }

            let ready = ReadyPayload {
                mem_total_mb: reported_total,
                mem_avail_mb: reported_avail,
                load: 0.42,
                cpus_online: 8,
                disk_total_mb: None,
                disk_avail_mb: None,
            };

            {
                let mut guard = node.lock().await;
                guard.telemetry = (&ready).into();
                guard.status = NodeStatus::Ready;
            }

            let guard = node.lock().await;
            prop_assert_eq!(guard.telemetry.mem_total_mb, reported_total);
            prop_assert_eq!(guard.telemetry.mem_avail_mb, reported_avail);
            prop_assert_eq!(guard.telemetry.load, 0.42);
            prop_assert_eq!(guard.telemetry.cpus_online, 8);
        });
    }
}
