// src/core/registry/network.rs

//! The Network Node registry (§3, §4.2): same connect/disconnect shape as the
//! Compute Node registry, minus the ordered sequence — NN placement scans in
//! map iteration order and only tracks an MRU uuid for spread (§4.3.3).

use super::NodeLifecycleFanout;
use crate::core::forwarding::NodeKind;
use crate::core::node::Node;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::warn;

pub struct NetworkNodeRegistry {
    members: RwLock<HashMap<String, Node>>,
    mru: Mutex<Option<String>>,
}

impl Default for NetworkNodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkNodeRegistry {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            mru: Mutex::new(None),
        }
    }

    pub async fn connect(&self, uuid: &str, fanout: &dyn NodeLifecycleFanout) {
        {
            let mut members = self.members.write();
            if members.contains_key(uuid) {
                warn!(node = uuid, "duplicate network node connect; ignoring");
                return;
            }
            members.insert(uuid.to_string(), Node::new(uuid, NodeKind::Network));
        }

        fanout.broadcast_node_connected(uuid, NodeKind::Network).await;
    }

    pub async fn disconnect(&self, uuid: &str, fanout: &dyn NodeLifecycleFanout) {
        let removed = self.members.write().remove(uuid).is_some();
        if !removed {
            warn!(node = uuid, "disconnect for unknown network node; ignoring");
            return;
        }

        {
            let mut mru = self.mru.lock();
            if mru.as_deref() == Some(uuid) {
                *mru = None;
            }
        }

        fanout
            .broadcast_node_disconnected(uuid, NodeKind::Network)
            .await;
    }

    /// Snapshot of current members in an arbitrary but stable-for-this-call order.
    /// Taken and released synchronously, never held across an `.await` (§5).
    pub fn snapshot(&self) -> Vec<Node> {
        self.members.read().values().cloned().collect()
    }

    pub fn current_mru(&self) -> Option<String> {
        self.mru.lock().clone()
    }

    pub fn set_mru(&self, uuid: &str) {
        *self.mru.lock() = Some(uuid.to_string());
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.members.read().contains_key(uuid)
    }

    pub fn get(&self, uuid: &str) -> Option<Node> {
        self.members.read().get(uuid).cloned()
    }
}
