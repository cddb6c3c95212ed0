//! Configuration loading and management.
//!
//! One TOML file describes a node deployment: its display name, the relay
//! endpoints it talks to, where durable collections live, and the timers
//! governing membership traffic.

use relay_proto::Encoding;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Node configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Node identity.
    #[serde(default)]
    pub node: NodeConfig,
    /// Relay endpoints and wire encoding.
    pub relay: RelayConfig,
    /// Durable storage location.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Membership timer intervals and bounded waits.
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Node identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeConfig {
    /// Display name. When unset the name is derived from the hostname so
    /// that replicated deployments of one image stay distinguishable.
    pub name: Option<String>,
}

impl NodeConfig {
    /// The effective display name for this node.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => {
                let host = std::env::var("HOSTNAME")
                    .unwrap_or_else(|_| std::process::id().to_string());
                format!("server_{host}")
            }
        }
    }
}

/// Relay endpoint configuration.
///
/// All four endpoints are `host:port` strings; the node connects out to
/// each of them (the broker, proxy, and reference service all bind).
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Broker back-side address serving the request-reply loop.
    pub broker: String,
    /// Proxy publish-side address for fanout and replication broadcasts.
    pub proxy_pub: String,
    /// Proxy subscribe-side address for membership intake.
    pub proxy_sub: String,
    /// Reference (election) service address.
    pub reference: String,
    /// Wire encoding, `"msgpack"` (default) or `"json"`.
    #[serde(default)]
    pub encoding: Encoding,
}

/// Durable storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the five collection files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Membership timer configuration, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Heartbeat interval to the reference service.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Replication broadcast interval.
    #[serde(default = "default_replication_secs")]
    pub replication_secs: u64,
    /// Bounded wait applied to every reference service call and to the
    /// proxy publisher's connects and writes.
    #[serde(default = "default_reference_timeout_secs")]
    pub reference_timeout_secs: u64,
}

impl TimingConfig {
    /// Heartbeat interval as a [`Duration`].
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    /// Replication interval as a [`Duration`].
    pub fn replication(&self) -> Duration {
        Duration::from_secs(self.replication_secs)
    }

    /// Reference call and proxy write timeout as a [`Duration`].
    pub fn reference_timeout(&self) -> Duration {
        Duration::from_secs(self.reference_timeout_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            replication_secs: default_replication_secs(),
            reference_timeout_secs: default_reference_timeout_secs(),
        }
    }
}

fn default_heartbeat_secs() -> u64 {
    10
}

fn default_replication_secs() -> u64 {
    30
}

fn default_reference_timeout_secs() -> u64 {
    5
}
