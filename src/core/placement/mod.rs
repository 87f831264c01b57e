// src/core/placement/mod.rs

//! Placement (§4.3): first-fit-with-MRU-rotation scans over a point-in-time
//! snapshot of a registry, speculative decrement applied by the caller while
//! still holding the winning node's lock.

use crate::core::errors::PlacementError;
use crate::core::node::Node;
use crate::core::payload::WorkloadRequest;
use crate::core::registry::{ComputeNodeRegistry, NetworkNodeRegistry};
use tokio::sync::OwnedMutexGuard;

/// A winning placement: the chosen node and its lock, held across the call
/// boundary so the caller can apply the speculative decrement before releasing
/// it (§4.3.2, "returns the node with its lock held").
pub struct PlacementPick {
    pub node: Node,
    pub guard: OwnedMutexGuard<crate::core::node::NodeInner>,
}

/// Scans Compute Nodes for a fit (§4.3.2):
/// 1. Snapshot the registry's current order and MRU cursor.
/// 2. Resolve the cursor's position in the snapshot, if set.
/// 3. Scan forward from the position after the cursor to the end.
/// 4. If nothing fit, restart from the beginning of the snapshot up to and
///    including the cursor position, so every node — including the previous
///    MRU — gets a second chance within the same call.
/// 5. On the first fit, set the registry's MRU cursor to the winner and return
///    its lock still held; every candidate's lock that failed to fit is
///    released before the next candidate is tried (fixes the NN asymmetry
///    noted for network placement below by never special-casing the release).
pub async fn place_on_compute(
    registry: &ComputeNodeRegistry,
    request: &WorkloadRequest,
) -> Result<PlacementPick, PlacementError> {
    let snapshot = registry.snapshot_order();
    if snapshot.is_empty() {
        return Err(PlacementError::NoComputeNodes);
    }

    let cursor_pos = registry
        .current_mru()
        .and_then(|mru| snapshot.iter().position(|n| n.uuid == mru));

    let start = cursor_pos.map(|p| p + 1).unwrap_or(0);

    if let Some(pick) = scan_range(&snapshot, start, snapshot.len(), request).await {
        registry.set_mru(&pick.node.uuid);
        return Ok(pick);
    }

    let wrap_end = cursor_pos.map(|p| p + 1).unwrap_or(0);
    if wrap_end > 0 {
        if let Some(pick) = scan_range(&snapshot, 0, wrap_end, request).await {
            registry.set_mru(&pick.node.uuid);
            return Ok(pick);
        }
    }

    Err(PlacementError::FullCloud)
}

/// Scans Network Nodes for a fit (§4.3.3): a single forward pass over the
/// snapshot, picking the first node that fits *and* (there is at most one NN,
/// or its UUID differs from the current `nnMRU`). Unlike Compute placement
/// there is no wrap/retry phase — a node equal to `nnMRU` is never a candidate
/// while another NN exists, even if it is the only one that currently fits.
pub async fn place_on_network(
    registry: &NetworkNodeRegistry,
    request: &WorkloadRequest,
) -> Result<PlacementPick, PlacementError> {
    let snapshot = registry.snapshot();
    if snapshot.is_empty() {
        return Err(PlacementError::NoNetworkNodes);
    }

    let mru = registry.current_mru();

    for node in &snapshot {
        let guard = node.lock().await;
        let is_candidate = snapshot.len() <= 1 || mru.as_deref() != Some(node.uuid.as_str());
        if is_candidate && guard.fits(request) {
            let pick = PlacementPick {
                node: node.clone(),
                guard,
            };
            registry.set_mru(&pick.node.uuid);
            return Ok(pick);
        }
        // guard dropped here regardless of branch taken; the non-selected
        // path never holds the lock past this iteration.
    }

    Err(PlacementError::NoNetworkNodes)
}

/// Tries each node in `snapshot[start..end]` in order, locking one candidate at
/// a time. A candidate's guard is dropped at the end of its loop iteration
/// unless it fit, so no lock outlives the single candidate it was taken for.
async fn scan_range(
    snapshot: &[Node],
    start: usize,
    end: usize,
    request: &WorkloadRequest,
) -> Option<PlacementPick> {
    for node in &snapshot[start.min(snapshot.len())..end.min(snapshot.len())] {
        let guard = node.lock().await;
        if guard.fits(request) {
            return Some(PlacementPick {
                node: node.clone(),
                guard,
            });
        }
        // guard dropped here; next candidate starts with a clean lock.
    }
    None
}

/// Applies the speculative decrement to the node still held by `pick.guard`
/// (§4.3.2: subtract the requested memory from available memory immediately,
/// ahead of the node's next READY report, so a burst of concurrent placements
/// does not all pick the same under-reported node).
pub fn apply_speculative_decrement(pick: &mut PlacementPick, request: &WorkloadRequest) {
    pick.guard.telemetry.mem_avail_mb = pick
        .guard
        .telemetry
        .mem_avail_mb
        .saturating_sub(request.mem_req_mb);
}
