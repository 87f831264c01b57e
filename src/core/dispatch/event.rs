// src/core/dispatch/event.rs

//! Event forwarding (§4.5): CNCI-directed tenant/network events route to the
//! concentrator instance named in the payload. Declarative pure-fan-out
//! opcodes (`EventOpcode::is_pure_fanout`) never reach this forwarder at all —
//! the transport broadcasts them to every Controller before dispatch runs.

use crate::core::errors::SchedulerError;
use crate::core::forwarding::{EventOpcode, ForwardDecision};
use crate::core::payload::{self, ConcentratorEventPayload};

pub struct EventForwarder;

impl Default for EventForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventForwarder {
    pub fn new() -> Self {
        Self
    }

    /// Forwards one event frame (§4.5). Callers must not invoke this for an
    /// opcode where `is_pure_fanout()` is true; those are handled entirely at
    /// the transport layer.
    pub fn forward(
        &self,
        opcode: EventOpcode,
        body: &[u8],
    ) -> Result<ForwardDecision, SchedulerError> {
        debug_assert!(
            !opcode.is_pure_fanout(),
            "pure fan-out opcodes must not reach the event forwarder"
        );

        match opcode {
            EventOpcode::TenantAdded | EventOpcode::TenantRemoved | EventOpcode::PublicIpAssigned => {
                let event: ConcentratorEventPayload = payload::from_yaml(body)?;
                match event.concentrator_uuid {
                    Some(uuid) if !uuid.is_empty() => Ok(ForwardDecision::recipient(uuid)),
                    _ => Ok(ForwardDecision::Discard),
                }
            }
            _ => Ok(ForwardDecision::Discard),
        }
    }
}
