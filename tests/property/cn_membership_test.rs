// tests/property/cn_membership_test.rs

//! ∀ sequence of connect/disconnect events: CN-map membership equals
//! CN-sequence membership at every point, and the MRU cursor either points
//! to a current member or is unset (§8).

use async_trait::async_trait;
use nebula_scheduler::core::forwarding::NodeKind;
use nebula_scheduler::core::registry::{ComputeNodeRegistry, NodeLifecycleFanout};
use proptest::prelude::*;
use std::collections::HashSet;

struct NullFanout;
#[async_trait]
impl NodeLifecycleFanout for NullFanout {
    async fn broadcast_node_connected(&self, _uuid: &str, _kind: NodeKind) {}
    async fn broadcast_node_disconnected(&self, _uuid: &str, _kind: NodeKind) {}
}

#[derive(Debug, Clone)]
enum Event {
    Connect(u8),
    Disconnect(u8),
}

fn events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(
        (any::<bool>(), 0u8..6).prop_map(|(connect, id)| {
            if connect {
                Event::Connect(id)
            } else {
                Event::Disconnect(id)
            }
        }),
        0..200,
    )
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn membership_and_mru_stay_consistent(events in events()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ComputeNodeRegistry::new();
            let fanout = NullFanout;
            let mut expected: HashSet<String> = HashSet::new();

            for event in events {
                match event {
                    Event::Connect(id) => {
                        let uuid = format!("n{id}");
                        registry.connect(&uuid, &fanout).await;
                        expected.insert(uuid);
                    }
                    Event::Disconnect(id) => {
                        let uuid = format!("n{id}");
                        registry.disconnect(&uuid, &fanout).await;
                        expected.remove(&uuid);
                    }
                }

                let order: HashSet<String> = registry
                    .snapshot_order()
                    .into_iter()
                    .map(|n| n.uuid)
                    .collect();
                prop_assert_eq!(&order, &expected);
                for uuid in &order {
                    prop_assert!(registry.contains(uuid));
                }

                if let Some(mru) = registry.current_mru() {
                    prop_assert!(expected.contains(&mru));
                }
            }
        });
    }
}
