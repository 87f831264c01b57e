// src/transport/mod.rs

//! Everything that touches a socket: framing, the accept loop, and the
//! per-connection handler. The scheduler core never imports this module's
//! internals back — it only sees `SchedulerState`/`EventSink` (§9, "transport
//! decoupling").

pub mod adapter;
pub mod listener;
pub mod peer;
pub mod wire;

pub use wire::{Frame, FrameType, WireCodec};

use crate::core::forwarding::PeerRole;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Per-peer outbound channel. Connection handlers own the receiving half and
/// drain it into the socket; everyone else only ever sends.
pub type Outbox = mpsc::UnboundedSender<Frame>;

/// Maps a connected peer's announced UUID to its outbound channel. Unlike the
/// scheduling registries (`ComputeNodeRegistry` et al.), this is purely a
/// socket directory — mirroring the teacher's own `DashMap`-backed client map,
/// since entries here are independent, high-churn, and never need the
/// ordered-scan or MRU-cursor guarantees the scheduling registries provide.
#[derive(Default)]
pub struct PeerDirectory {
    peers: DashMap<String, Outbox>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, uuid: &str, outbox: Outbox) {
        self.peers.insert(uuid.to_string(), outbox);
    }

    pub fn deregister(&self, uuid: &str) {
        self.peers.remove(uuid);
    }

    /// Sends `frame` to `uuid` if it is currently connected. Returns whether
    /// delivery was attempted; a dead channel (peer mid-disconnect) is treated
    /// the same as "not connected" rather than an error (§7, recipients that
    /// have gone away simply drop the frame).
    pub fn send_to(&self, uuid: &str, frame: Frame) -> bool {
        match self.peers.get(uuid) {
            Some(outbox) => outbox.send(frame).is_ok(),
            None => false,
        }
    }

    pub fn is_connected(&self, uuid: &str) -> bool {
        self.peers.contains_key(uuid)
    }
}

/// Maps the wire's `Role` string (§6) to the scheduler's internal role
/// vocabulary. Anything unrecognized is `PeerRole::Other` and is never
/// tracked in any registry (§6).
pub fn parse_role(role: &str) -> PeerRole {
    match role {
        "Controller" => PeerRole::Controller,
        "ComputeNode" => PeerRole::ComputeAgent,
        "NetworkNode" => PeerRole::NetworkAgent,
        _ => PeerRole::Other,
    }
}
