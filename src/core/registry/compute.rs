// src/core/registry/compute.rs

//! The Compute Node registry: a mapping plus an ordered sequence (append order
//! defines placement scan order) and an MRU cursor for spread (§3, §4.1, §4.3.2).

use super::NodeLifecycleFanout;
use crate::core::forwarding::NodeKind;
use crate::core::node::Node;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::warn;

struct Members {
    by_uuid: HashMap<String, Node>,
    order: Vec<Node>,
}

/// Registry of connected Compute Nodes.
///
/// The MRU cursor is tracked by UUID rather than a raw index: the placement
/// engine resolves the cursor's position against its own snapshot of `order` at
/// the start of each scan, which keeps the cursor trivially valid across
/// concurrent connects/disconnects without index-shifting bookkeeping. This
/// still satisfies §8's invariant ("the MRU cursor, if set, points to a current
/// member or is unset") exactly.
pub struct ComputeNodeRegistry {
    members: RwLock<Members>,
    mru: Mutex<Option<String>>,
}

impl Default for ComputeNodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeNodeRegistry {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(Members {
                by_uuid: HashMap::new(),
                order: Vec::new(),
            }),
            mru: Mutex::new(None),
        }
    }

    /// connect(uuid) (§4.1). Idempotent: a reconnect of an already-present UUID
    /// is a warning, not a replacement.
    pub async fn connect(&self, uuid: &str, fanout: &dyn NodeLifecycleFanout) {
        {
            let mut members = self.members.write();
            if members.by_uuid.contains_key(uuid) {
                warn!(node = uuid, "duplicate compute node connect; ignoring");
                return;
            }
            let node = Node::new(uuid, NodeKind::Compute);
            members.by_uuid.insert(uuid.to_string(), node.clone());
            members.order.push(node);
        } // writer lock released before the fan-out call (§5 lock discipline).

        fanout.broadcast_node_connected(uuid, NodeKind::Compute).await;
    }

    /// disconnect(uuid) (§4.1). Clears the MRU cursor if it named the removed node.
    pub async fn disconnect(&self, uuid: &str, fanout: &dyn NodeLifecycleFanout) {
        let removed = {
            let mut members = self.members.write();
            let removed = members.by_uuid.remove(uuid).is_some();
            if removed {
                members.order.retain(|n| n.uuid != uuid);
            }
            removed
        };

        if !removed {
            warn!(node = uuid, "disconnect for unknown compute node; ignoring");
            return;
        }

        {
            let mut mru = self.mru.lock();
            if mru.as_deref() == Some(uuid) {
                *mru = None;
            }
        }

        fanout
            .broadcast_node_disconnected(uuid, NodeKind::Compute)
            .await;
    }

    /// A point-in-time clone of the scan order, cheap because `Node` is mostly
    /// `Arc` handles. Taken and released synchronously so the registry's lock is
    /// never held across an `.await` (§5, "snapshot-then-send patterns").
    pub fn snapshot_order(&self) -> Vec<Node> {
        self.members.read().order.clone()
    }

    pub fn current_mru(&self) -> Option<String> {
        self.mru.lock().clone()
    }

    pub fn set_mru(&self, uuid: &str) {
        *self.mru.lock() = Some(uuid.to_string());
    }

    pub fn len(&self) -> usize {
        self.members.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.members.read().by_uuid.contains_key(uuid)
    }

    pub fn get(&self, uuid: &str) -> Option<Node> {
        self.members.read().by_uuid.get(uuid).cloned()
    }
}
