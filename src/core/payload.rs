// src/core/payload.rs

//! Structural YAML payload definitions (§6). The scheduler only inspects the
//! fields it needs to route or place a workload; it does not own these schemas.

use crate::core::errors::SchedulerError;
use serde::{Deserialize, Serialize};

/// `READY` telemetry record (§3, §6). Disk/CPU fields are accepted but not used
/// by the fit predicate (§9, "intentional in the current design").
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyPayload {
    #[serde(rename = "MemTotalMB")]
    pub mem_total_mb: u64,
    #[serde(rename = "MemAvailableMB")]
    pub mem_avail_mb: u64,
    #[serde(rename = "Load", default)]
    pub load: f64,
    #[serde(rename = "CpusOnline", default)]
    pub cpus_online: u32,
    #[serde(rename = "DiskTotalMB", default)]
    pub disk_total_mb: Option<u64>,
    #[serde(rename = "DiskAvailableMB", default)]
    pub disk_avail_mb: Option<u64>,
}

/// One `{Type, Value}` entry of a START command's `RequestedResources` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestedResource {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Value")]
    pub value: serde_yaml::Value,
}

/// The START command payload.
#[derive(Debug, Clone, Deserialize)]
pub struct StartPayload {
    #[serde(rename = "InstanceUUID")]
    pub instance_uuid: String,
    #[serde(rename = "RequestedResources")]
    pub requested_resources: Vec<RequestedResource>,
}

/// Target kind derived from START's optional `NetworkNode` resource flag (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Compute,
    Network,
}

/// A workload request derived from a parsed START payload (§3).
#[derive(Debug, Clone)]
pub struct WorkloadRequest {
    pub instance_uuid: String,
    pub mem_req_mb: u64,
    pub target: TargetKind,
}

impl StartPayload {
    /// Parses the `RequestedResources` array into a `WorkloadRequest`, enforcing
    /// the invariants in §3: `MemMB` required and > 0, `NetworkNode` optional and
    /// in {0, 1}.
    pub fn into_workload_request(self) -> Result<WorkloadRequest, SchedulerError> {
        let mut mem_req_mb: Option<u64> = None;
        let mut network_flag: u64 = 0;

        for resource in &self.requested_resources {
            match resource.kind.as_str() {
                "MemMB" => {
                    let value = resource.value.as_u64().ok_or_else(|| {
                        SchedulerError::InvalidRequest("MemMB value is not a number".into())
                    })?;
                    mem_req_mb = Some(value);
                }
                "NetworkNode" => {
                    network_flag = resource.value.as_u64().ok_or_else(|| {
                        SchedulerError::InvalidRequest(
                            "NetworkNode value is not a number".into(),
                        )
                    })?;
                }
                _ => {} // unrecognized resource types are informational only.
            }
        }

        let mem_req_mb = mem_req_mb
            .ok_or_else(|| SchedulerError::InvalidRequest("missing MemMB resource".into()))?;
        if mem_req_mb == 0 {
            return Err(SchedulerError::InvalidRequest(
                "MemMB must be strictly greater than zero".into(),
            ));
        }

        let target = match network_flag {
            0 => TargetKind::Compute,
            1 => TargetKind::Network,
            other => {
                return Err(SchedulerError::InvalidRequest(format!(
                    "invalid NetworkNode flag: {other}"
                )));
            }
        };

        Ok(WorkloadRequest {
            instance_uuid: self.instance_uuid,
            mem_req_mb,
            target,
        })
    }
}

/// RESTART / STOP / DELETE / EVACUATE payload. `InstanceUUID` is present on all
/// but EVACUATE; the dispatcher only requires `WorkloadAgentUUID` to route.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecyclePayload {
    #[serde(rename = "InstanceUUID", default)]
    pub instance_uuid: Option<String>,
    #[serde(rename = "WorkloadAgentUUID", default)]
    pub workload_agent_uuid: Option<String>,
}

/// CNCI-directed tenant/network event payload (`TenantAdded`, `TenantRemoved`,
/// `PublicIPAssigned`).
#[derive(Debug, Clone, Deserialize)]
pub struct ConcentratorEventPayload {
    #[serde(rename = "ConcentratorUUID", default)]
    pub concentrator_uuid: Option<String>,
}

/// `StartFailure` error frame payload, sent to the originating Controller (§4.3.5).
#[derive(Debug, Clone, Serialize)]
pub struct StartFailurePayload {
    #[serde(rename = "InstanceUUID")]
    pub instance_uuid: String,
    #[serde(rename = "Reason")]
    pub reason: String,
}

/// NodeConnected / NodeDisconnected event payload (§4.5, §6).
#[derive(Debug, Clone, Serialize)]
pub struct NodeLifecycleEventPayload {
    #[serde(rename = "NodeUUID")]
    pub node_uuid: String,
    #[serde(rename = "NodeType")]
    pub node_type: String,
}

pub fn to_yaml<T: Serialize>(value: &T) -> Vec<u8> {
    serde_yaml::to_string(value)
        .expect("payload types are plain data and always serialize")
        .into_bytes()
}

pub fn from_yaml<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, SchedulerError> {
    serde_yaml::from_slice(bytes).map_err(|e| SchedulerError::MalformedPayload(e.to_string()))
}
