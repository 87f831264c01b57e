// src/core/errors.rs

//! Defines the primary error type for the scheduler core.

use thiserror::Error;

/// Reasons the placement engine can fail to find a node, matching the `Reason`
/// values carried in a `StartFailure` error frame (§4.3.5).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    #[error("NoComputeNodes")]
    NoComputeNodes,
    #[error("NoNetworkNodes")]
    NoNetworkNodes,
    #[error("FullCloud")]
    FullCloud,
}

impl PlacementError {
    /// The wire-level `Reason` string carried in a `StartFailure` payload.
    pub fn reason(&self) -> &'static str {
        match self {
            PlacementError::NoComputeNodes => "NoComputeNodes",
            PlacementError::NoNetworkNodes => "NoNetworkNodes",
            PlacementError::FullCloud => "FullCloud",
        }
    }
}

/// The scheduler's error currency. Every fallible core operation returns
/// `Result<T, SchedulerError>` rather than panicking; `anyhow` is reserved for the
/// process-bootstrap layer (config loading, TLS setup) where a contextualized
/// `Result<()>` is the natural fit.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// memReq <= 0, an out-of-range NetworkNode flag, or a missing required field.
    #[error("invalid workload request: {0}")]
    InvalidRequest(String),

    /// A YAML payload failed to parse, or a routing UUID field was empty.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Placement could not find a fitting node.
    #[error("placement exhausted: {0}")]
    Placement(#[from] PlacementError),

    /// A command arrived from an unknown or non-MASTER Controller.
    #[error("unauthorized command from {0}")]
    Unauthorized(String),
}
