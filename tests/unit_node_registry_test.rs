// tests/unit_node_registry_test.rs

//! Black-box coverage of the CN/NN registries' connect/disconnect/MRU
//! contract through the crate's public API (§4.1).

use async_trait::async_trait;
use nebula_scheduler::core::forwarding::NodeKind;
use nebula_scheduler::core::registry::{ComputeNodeRegistry, NetworkNodeRegistry, NodeLifecycleFanout};

#[derive(Default)]
struct RecordingFanout {
    events: tokio::sync::Mutex<Vec<(String, NodeKind, bool)>>,
}

#[async_trait]
impl NodeLifecycleFanout for RecordingFanout {
    async fn broadcast_node_connected(&self, uuid: &str, kind: NodeKind) {
        self.events.lock().await.push((uuid.to_string(), kind, true));
    }
    async fn broadcast_node_disconnected(&self, uuid: &str, kind: NodeKind) {
        self.events.lock().await.push((uuid.to_string(), kind, false));
    }
}

#[tokio::test]
async fn compute_registry_tracks_append_order_and_broadcasts() {
    let registry = ComputeNodeRegistry::new();
    let fanout = RecordingFanout::default();

    registry.connect("cn1", &fanout).await;
    registry.connect("cn2", &fanout).await;
    registry.connect("cn3", &fanout).await;

    let order: Vec<String> = registry.snapshot_order().into_iter().map(|n| n.uuid).collect();
    assert_eq!(order, vec!["cn1", "cn2", "cn3"]);

    registry.disconnect("cn2", &fanout).await;
    let order: Vec<String> = registry.snapshot_order().into_iter().map(|n| n.uuid).collect();
    assert_eq!(order, vec!["cn1", "cn3"]);

    let events = fanout.events.lock().await;
    assert_eq!(
        *events,
        vec![
            ("cn1".to_string(), NodeKind::Compute, true),
            ("cn2".to_string(), NodeKind::Compute, true),
            ("cn3".to_string(), NodeKind::Compute, true),
            ("cn2".to_string(), NodeKind::Compute, false),
        ]
    );
}

#[tokio::test]
async fn compute_registry_mru_clears_only_for_its_own_removal() {
    let registry = ComputeNodeRegistry::new();
    let fanout = RecordingFanout::default();
    registry.connect("cn1", &fanout).await;
    registry.connect("cn2", &fanout).await;

    registry.set_mru("cn1");
    registry.disconnect("cn2", &fanout).await;
    assert_eq!(registry.current_mru(), Some("cn1".to_string()));

    registry.disconnect("cn1", &fanout).await;
    assert_eq!(registry.current_mru(), None);
}

#[tokio::test]
async fn network_registry_has_no_ordered_sequence_but_tracks_membership() {
    let registry = NetworkNodeRegistry::new();
    let fanout = RecordingFanout::default();

    registry.connect("nn1", &fanout).await;
    registry.connect("nn2", &fanout).await;
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("nn1"));

    registry.disconnect("nn1", &fanout).await;
    assert!(!registry.contains("nn1"));
    assert_eq!(registry.len(), 1);
}
