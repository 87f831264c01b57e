// src/core/forwarding.rs

//! The `ForwardDecision` returned by the command and event callbacks, plus the
//! opcode vocabulary the dispatcher and event forwarder switch on.
//!
//! Forward decisions never perform I/O themselves (§9, "Transport decoupling").
//! They are plain data; the transport is responsible for acting on them.

use std::fmt;

/// The role a connected peer announced on CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Controller,
    ComputeAgent,
    NetworkAgent,
    /// Any role the transport tags that the scheduler does not recognize; connects
    /// and disconnects for these are ignored entirely (§6).
    Other,
}

/// The two node kinds tracked by independent registries (§3, §9 "Role polymorphism").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Compute,
    Network,
}

impl NodeKind {
    /// The `NodeType` string carried in NodeConnected/NodeDisconnected event payloads.
    pub fn wire_name(&self) -> &'static str {
        match self {
            NodeKind::Compute => "ComputeNode",
            NodeKind::Network => "NetworkNode",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Command opcodes the dispatcher (§4.4) recognizes. Anything else is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOpcode {
    Start,
    Restart,
    Stop,
    Delete,
    Evacuate,
}

impl CommandOpcode {
    pub fn parse(opcode: &str) -> Option<Self> {
        match opcode {
            "Start" => Some(CommandOpcode::Start),
            "Restart" => Some(CommandOpcode::Restart),
            "Stop" => Some(CommandOpcode::Stop),
            "Delete" => Some(CommandOpcode::Delete),
            "Evacuate" => Some(CommandOpcode::Evacuate),
            _ => None,
        }
    }
}

/// Event opcodes the event forwarder (§4.5) recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOpcode {
    TenantAdded,
    TenantRemoved,
    PublicIpAssigned,
    /// Opcodes that are declared to the transport as pure fan-out-to-all-Controllers
    /// rules and never reach the event forwarder's own routing logic.
    Stats,
    TraceReport,
    InstanceDeleted,
    ConcentratorInstanceAdded,
    StartFailure,
    StopFailure,
    RestartFailure,
}

impl EventOpcode {
    pub fn parse(opcode: &str) -> Option<Self> {
        match opcode {
            "TenantAdded" => Some(EventOpcode::TenantAdded),
            "TenantRemoved" => Some(EventOpcode::TenantRemoved),
            "PublicIPAssigned" => Some(EventOpcode::PublicIpAssigned),
            "Stats" => Some(EventOpcode::Stats),
            "TraceReport" => Some(EventOpcode::TraceReport),
            "InstanceDeleted" => Some(EventOpcode::InstanceDeleted),
            "ConcentratorInstanceAdded" => Some(EventOpcode::ConcentratorInstanceAdded),
            "StartFailure" => Some(EventOpcode::StartFailure),
            "StopFailure" => Some(EventOpcode::StopFailure),
            "RestartFailure" => Some(EventOpcode::RestartFailure),
            _ => None,
        }
    }

    /// Opcodes in the declarative "pure fan-out" table (§4.5): the transport
    /// broadcasts these to every connected Controller without ever calling into
    /// the event forwarder. Listed here, not matched in `onEventForward`, because
    /// that callback is simply never invoked for them.
    pub fn is_pure_fanout(&self) -> bool {
        matches!(
            self,
            EventOpcode::Stats
                | EventOpcode::TraceReport
                | EventOpcode::InstanceDeleted
                | EventOpcode::ConcentratorInstanceAdded
                | EventOpcode::StartFailure
                | EventOpcode::StopFailure
                | EventOpcode::RestartFailure
        )
    }
}

/// The outcome of `onCommandForward` / `onEventForward`: either discard the frame,
/// or deliver it unmodified to exactly one named recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardDecision {
    Discard,
    Recipient(String),
}

impl ForwardDecision {
    pub fn recipient(uuid: impl Into<String>) -> Self {
        ForwardDecision::Recipient(uuid.into())
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, ForwardDecision::Discard)
    }
}
