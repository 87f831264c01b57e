// src/transport/peer.rs

//! Per-connection handling: the Connect handshake, the read/dispatch loop, and
//! RAII cleanup on disconnect (§4, §6, modeled on `connection::ConnectionGuard`).

use crate::core::dispatch::command::CommandOutcome;
use crate::core::forwarding::{CommandOpcode, EventOpcode, PeerRole};
use crate::core::metrics;
use crate::core::node::{Node, NodeStatus};
use crate::core::payload::{self, ReadyPayload, StartFailurePayload};
use crate::core::state::SchedulerState;
use crate::transport::wire::{Frame, FrameType, WireCodec};
use crate::transport::{parse_role, PeerDirectory};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{info, warn};

/// RAII guard removing a peer from the socket directory when its connection
/// handler returns, including on an early `?`/panic unwind. Mirrors
/// `ConnectionGuard`'s Drop, but stays purely synchronous: the registry-level
/// disconnect (which needs to `.await` a node lock to run the fan-out) is
/// always performed explicitly before this guard drops, never from `Drop`
/// itself (see DESIGN.md).
struct PeerGuard {
    directory: Arc<PeerDirectory>,
    uuid: String,
    addr: SocketAddr,
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.directory.deregister(&self.uuid);
        info!(peer = %self.uuid, addr = %self.addr, "peer connection closed");
    }
}

/// Handles one accepted connection end-to-end, independent of whether it came
/// in plaintext or through the TLS acceptor (`S` is generic over both).
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    state: Arc<SchedulerState>,
    directory: Arc<PeerDirectory>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut framed = Framed::new(stream, WireCodec);

    let (role, uuid) = match await_handshake(&mut framed).await {
        Some(pair) => pair,
        None => return,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    directory.register(&uuid, tx);
    let _guard = PeerGuard {
        directory: directory.clone(),
        uuid: uuid.clone(),
        addr,
    };

    match role {
        PeerRole::Controller => {
            state.controllers.connect(&uuid);
        }
        PeerRole::ComputeAgent => {
            state.compute.connect(&uuid, state.as_ref()).await;
        }
        PeerRole::NetworkAgent => {
            state.network.connect(&uuid, state.as_ref()).await;
        }
        PeerRole::Other => {
            warn!(peer = %uuid, addr = %addr, "unrecognized role on connect; closing");
            return;
        }
    }

    info!(peer = %uuid, addr = %addr, ?role, "peer connected");

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                break;
            }

            outbound = rx.recv() => {
                match outbound {
                    Some(frame) => {
                        if let Err(e) = framed.send(frame).await {
                            warn!(peer = %uuid, "failed to write frame: {e}");
                            break;
                        }
                    }
                    None => break,
                }
            }

            inbound = framed.next() => {
                match inbound {
                    Some(Ok(frame)) => {
                        if !handle_frame(&state, &directory, role, &uuid, frame).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(peer = %uuid, "frame decode error: {e}");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    disconnect(&state, role, &uuid).await;
}

/// Reads the mandatory first `Connect` frame. Returns `None` (closing the
/// connection) on any protocol violation.
async fn await_handshake<S>(framed: &mut Framed<S, WireCodec>) -> Option<(PeerRole, String)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(frame)) if frame.frame_type == FrameType::Connect => {
            if frame.sender_uuid.is_empty() {
                warn!("Connect frame missing a sender UUID; closing");
                return None;
            }
            Some((parse_role(&frame.role), frame.sender_uuid))
        }
        Some(Ok(_)) => {
            warn!("first frame on a new connection was not Connect; closing");
            None
        }
        Some(Err(e)) => {
            warn!("error reading handshake frame: {e}");
            None
        }
        None => None,
    }
}

/// Returns `false` when the connection loop should stop.
async fn handle_frame(
    state: &Arc<SchedulerState>,
    directory: &Arc<PeerDirectory>,
    role: PeerRole,
    uuid: &str,
    frame: Frame,
) -> bool {
    match frame.frame_type {
        FrameType::Disconnect => false,
        FrameType::Status => {
            handle_status(state, role, uuid, &frame.status, &frame.body).await;
            true
        }
        FrameType::Command => {
            handle_command(state, directory, uuid, &frame).await;
            true
        }
        FrameType::Event => {
            handle_event(state, directory, uuid, &frame).await;
            true
        }
        FrameType::Connect | FrameType::SendError => {
            warn!(peer = %uuid, "unexpected frame type after handshake; ignoring");
            true
        }
    }
}

/// Applies a STATUS frame (§4.6). A Controller has no node status and is
/// ignored outright; otherwise the sender must already be a registered CN or
/// NN. `READY` parses the body as telemetry and overwrites it; any other
/// status (e.g. `FULL`) only updates the node's status field.
async fn handle_status(
    state: &Arc<SchedulerState>,
    role: PeerRole,
    uuid: &str,
    status: &str,
    body: &[u8],
) {
    let node: Option<Node> = match role {
        PeerRole::Controller => {
            warn!(peer = %uuid, "Status frame from a Controller; ignoring");
            return;
        }
        PeerRole::ComputeAgent => state.compute.get(uuid),
        PeerRole::NetworkAgent => state.network.get(uuid),
        PeerRole::Other => None,
    };

    let Some(node) = node else {
        warn!(peer = %uuid, "Status frame from an unregistered node; dropping");
        return;
    };

    if status.eq_ignore_ascii_case("ready") {
        let ready: ReadyPayload = match payload::from_yaml(body) {
            Ok(r) => r,
            Err(e) => {
                warn!(peer = %uuid, "malformed Ready payload: {e}");
                return;
            }
        };
        let mut guard = node.lock().await;
        guard.telemetry = (&ready).into();
        guard.status = NodeStatus::Ready;
        return;
    }

    let mut guard = node.lock().await;
    guard.status = if status.eq_ignore_ascii_case("full") {
        NodeStatus::Full
    } else {
        NodeStatus::Other(status.to_string())
    };
}

async fn handle_command(
    state: &Arc<SchedulerState>,
    directory: &Arc<PeerDirectory>,
    sender_uuid: &str,
    frame: &Frame,
) {
    let Some(opcode) = CommandOpcode::parse(&frame.opcode) else {
        metrics::COMMANDS_DISCARDED_TOTAL.inc();
        return;
    };

    match state.dispatcher.dispatch(sender_uuid, opcode, &frame.body).await {
        Ok(CommandOutcome::Forward(decision)) => {
            if decision.is_discard() {
                metrics::COMMANDS_DISCARDED_TOTAL.inc();
                return;
            }
            if let crate::core::forwarding::ForwardDecision::Recipient(recipient) = decision {
                let delivered = directory.send_to(
                    &recipient,
                    Frame::command(frame.opcode.clone(), sender_uuid, frame.body.clone()),
                );
                if delivered {
                    metrics::COMMANDS_FORWARDED_TOTAL.inc();
                } else {
                    metrics::COMMANDS_DISCARDED_TOTAL.inc();
                }
            }
        }
        Ok(CommandOutcome::PlacementFailed {
            instance_uuid,
            reason,
        }) => {
            let body = payload::to_yaml(&StartFailurePayload {
                instance_uuid,
                reason: reason.to_string(),
            });
            directory.send_to(sender_uuid, Frame::send_error("StartFailure", body));
        }
        Err(e) => {
            warn!(peer = %sender_uuid, "command dispatch error: {e}");
            metrics::COMMANDS_DISCARDED_TOTAL.inc();
        }
    }
}

async fn handle_event(
    state: &Arc<SchedulerState>,
    directory: &Arc<PeerDirectory>,
    sender_uuid: &str,
    frame: &Frame,
) {
    let Some(opcode) = EventOpcode::parse(&frame.opcode) else {
        return;
    };

    if opcode.is_pure_fanout() {
        let opcode_name = frame.opcode.clone();
        let body = frame.body.clone();
        for controller in state.controllers.all_uuids() {
            directory.send_to(&controller, Frame::event(opcode_name.clone(), sender_uuid, body.clone()));
        }
        metrics::EVENTS_FORWARDED_TOTAL.inc();
        return;
    }

    match state.events.forward(opcode, &frame.body) {
        Ok(decision) => {
            if let crate::core::forwarding::ForwardDecision::Recipient(recipient) = decision {
                if directory.send_to(
                    &recipient,
                    Frame::event(frame.opcode.clone(), sender_uuid, frame.body.clone()),
                ) {
                    metrics::EVENTS_FORWARDED_TOTAL.inc();
                }
            }
        }
        Err(e) => warn!(peer = %sender_uuid, "event forwarding error: {e}"),
    }
}

async fn disconnect(state: &Arc<SchedulerState>, role: PeerRole, uuid: &str) {
    match role {
        PeerRole::Controller => state.controllers.disconnect(uuid),
        PeerRole::ComputeAgent => state.compute.disconnect(uuid, state.as_ref()).await,
        PeerRole::NetworkAgent => state.network.disconnect(uuid, state.as_ref()).await,
        PeerRole::Other => {}
    }
}
