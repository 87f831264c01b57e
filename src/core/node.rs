// src/core/node.rs

//! The shared worker-node record (§3). A `Node` is exclusively owned by one
//! registry; the telemetry/status fields are mutated only while holding the
//! node's own lock, never the registry's.

use crate::core::forwarding::NodeKind;
use crate::core::payload::{ReadyPayload, WorkloadRequest};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// The last-known status of a node (§3). `Other` carries whatever status string
/// the Agent reported that isn't CONNECTED/READY/FULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeStatus {
    Connected,
    Ready,
    Full,
    Other(String),
}

/// Live resource telemetry, undefined (all zero) until the node's first READY.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub mem_total_mb: u64,
    pub mem_avail_mb: u64,
    pub load: f64,
    pub cpus_online: u32,
}

impl From<&ReadyPayload> for Telemetry {
    fn from(ready: &ReadyPayload) -> Self {
        Telemetry {
            mem_total_mb: ready.mem_total_mb,
            mem_avail_mb: ready.mem_avail_mb,
            load: ready.load,
            cpus_online: ready.cpus_online,
        }
    }
}

/// The part of a `Node` protected by its own lock.
#[derive(Debug)]
pub struct NodeInner {
    pub status: NodeStatus,
    pub telemetry: Telemetry,
}

impl NodeInner {
    /// The fit predicate (§4.3.1): READY and enough available memory. No other
    /// resource participates at the scheduler.
    pub fn fits(&self, request: &WorkloadRequest) -> bool {
        self.status == NodeStatus::Ready && self.telemetry.mem_avail_mb >= request.mem_req_mb
    }
}

/// A connected CN or NN. Cheap to clone: identity fields plus an `Arc` to the
/// locked inner state, so registries can hand out owned copies during a scan
/// without holding a registry lock across an `.await`.
#[derive(Debug, Clone)]
pub struct Node {
    pub uuid: String,
    pub kind: NodeKind,
    inner: Arc<Mutex<NodeInner>>,
}

impl Node {
    pub fn new(uuid: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            uuid: uuid.into(),
            kind,
            inner: Arc::new(Mutex::new(NodeInner {
                status: NodeStatus::Connected,
                telemetry: Telemetry::default(),
            })),
        }
    }

    /// Acquires the node's own lock. Returns an owned guard (not borrowed from
    /// `&self`) so a winning placement pick can carry the lock back across a
    /// function boundary to the caller that applies the speculative decrement
    /// (§4.3.2, "returns the node with its lock held").
    pub async fn lock(&self) -> OwnedMutexGuard<NodeInner> {
        self.inner.clone().lock_owned().await
    }
}
