// src/config.rs

//! Manages scheduler configuration: loading, resolving dynamic values, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::warn;

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4443
}
fn default_metrics_port() -> u16 {
    9108
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_connections() -> usize {
    10_000
}
fn default_heartbeat_interval_secs() -> u64 {
    30
}

/// Configuration for the TLS-authenticated transport listener.
///
/// The underlying framed transport itself is an external collaborator (§1); this struct
/// only carries the paths the scheduler needs to hand to it at startup.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to the server certificate (`--cert`). TLS is enabled only when both
    /// `cert_path` and `ca_path` are set; otherwise the listener accepts plaintext
    /// connections, which is appropriate for local development and tests only.
    #[serde(default)]
    pub cert_path: Option<String>,
    /// Path to the CA bundle used to authenticate peers (`--cacert`).
    #[serde(default)]
    pub ca_path: Option<String>,

    #[serde(default)]
    pub key_path: Option<String>,
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        self.cert_path.is_some() && self.ca_path.is_some()
    }
}

/// A raw representation of the config file before defaults are applied and validated.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_metrics_port")]
    metrics_port: u16,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_max_connections")]
    max_connections: usize,
    #[serde(default = "default_heartbeat_interval_secs")]
    heartbeat_interval_secs: u64,
    #[serde(default)]
    tls: TlsConfig,
    #[serde(default)]
    fd_limit: Option<u64>,
}

/// The final, validated, resolved scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub log_level: String,
    pub max_connections: usize,
    /// Interval for the informational heartbeat log line (registry sizes). `0` disables it.
    pub heartbeat_interval_secs: u64,
    pub tls: TlsConfig,
    /// Best-effort override for the process's open-file soft limit at startup.
    pub fd_limit: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
            max_connections: default_max_connections(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            tls: TlsConfig::default(),
            fd_limit: None,
        }
    }
}

impl Config {
    /// Creates a new `Config` by reading and parsing a TOML file. Missing files are not
    /// an error at this layer — callers that want a hard requirement check existence first.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at '{path}'"))?;
        let raw: RawConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML from '{path}'"))?;

        let config = Config {
            host: raw.host,
            port: raw.port,
            metrics_port: raw.metrics_port,
            log_level: raw.log_level,
            max_connections: raw.max_connections,
            heartbeat_interval_secs: raw.heartbeat_interval_secs,
            tls: raw.tls,
            fd_limit: raw.fd_limit,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration for logical consistency.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.metrics_port == self.port {
            return Err(anyhow!(
                "metrics_port must differ from the scheduler port so metrics polling never competes with the node/controller protocol"
            ));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(anyhow!("max_connections cannot be 0"));
        }
        if self.tls.cert_path.is_some() != self.tls.ca_path.is_some() {
            warn!(
                "only one of tls.cert_path / tls.ca_path is set; TLS will remain disabled until both are provided"
            );
        }
        Ok(())
    }
}
