// src/core/registry/controller.rs

//! The Controller registry and master/backup election (§4.2).
//!
//! The first Controller to connect becomes Master; every later one is a Backup
//! until promoted. Role reads/writes are synchronous (`parking_lot::Mutex`) and
//! scoped per-Controller so election never needs the registry's own writer lock
//! held any longer than the membership mutation itself.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRole {
    Master,
    Backup,
}

#[derive(Debug)]
pub struct Controller {
    pub uuid: String,
    role: Mutex<ControllerRole>,
}

impl Controller {
    fn new(uuid: impl Into<String>, role: ControllerRole) -> Arc<Self> {
        Arc::new(Self {
            uuid: uuid.into(),
            role: Mutex::new(role),
        })
    }

    pub fn role(&self) -> ControllerRole {
        *self.role.lock()
    }
}

/// The result of a gate check (§4.4, §4.5): is the sender a known, connected
/// Controller, and if so, which role did it last have?
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    Unknown,
    Known { role: ControllerRole },
}

pub struct ControllerRegistry {
    members: RwLock<HashMap<String, Arc<Controller>>>,
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
        }
    }

    /// connect(uuid) (§4.2): elects Master if the registry was empty, else joins
    /// as Backup. Idempotent on a duplicate connect.
    pub fn connect(&self, uuid: &str) -> ControllerRole {
        let mut members = self.members.write();
        if let Some(existing) = members.get(uuid) {
            warn!(controller = uuid, "duplicate controller connect; ignoring");
            return existing.role();
        }

        let role = if members.is_empty() {
            ControllerRole::Master
        } else {
            ControllerRole::Backup
        };
        members.insert(uuid.to_string(), Controller::new(uuid, role));
        crate::core::metrics::CONNECTED_CONTROLLERS.inc();
        info!(controller = uuid, ?role, "controller connected");
        role
    }

    /// disconnect(uuid) (§4.2): if the departing Controller was Master, promotes
    /// an arbitrary remaining Backup. If none remain, the cluster is left without
    /// a Master until the next connect — out-of-band notification of that state
    /// is left to the deployment's own alerting, not modeled here (see DESIGN.md).
    pub fn disconnect(&self, uuid: &str) {
        let mut members = self.members.write();
        let Some(departing) = members.remove(uuid) else {
            warn!(controller = uuid, "disconnect for unknown controller; ignoring");
            return;
        };
        crate::core::metrics::CONNECTED_CONTROLLERS.dec();

        if departing.role() != ControllerRole::Master {
            return;
        }

        if let Some(successor) = members.values().next() {
            *successor.role.lock() = ControllerRole::Master;
            crate::core::metrics::CONTROLLER_PROMOTIONS_TOTAL.inc();
            info!(controller = successor.uuid, "promoted to master controller");
        } else {
            warn!("master controller departed with no backup to promote");
        }
    }

    pub fn gate(&self, uuid: &str) -> GateResult {
        match self.members.read().get(uuid) {
            Some(controller) => GateResult::Known {
                role: controller.role(),
            },
            None => GateResult::Unknown,
        }
    }

    /// All currently-connected Controller UUIDs, for pure fan-out delivery (§4.5).
    pub fn all_uuids(&self) -> Vec<String> {
        self.members.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
