//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_heartbeat_interval_secs, default_register_attempts, default_register_backoff_ms,
    default_replication_interval_secs, default_resync_every, default_stale_after_secs,
};
use super::validation::{ValidationError, validate};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Prometheus metrics HTTP port. 0 disables the endpoint.
    #[serde(default)]
    pub metrics_port: u16,
    /// Where the membership registry lives.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Background task periods and request-loop thresholds.
    #[serde(default)]
    pub timers: TimersConfig,
    /// Application-server nodes hosted by this process.
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeConfig>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Registry placement.
///
/// Exactly one of `listen` and `address` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Host the registry in this process and expose it on this address.
    pub listen: Option<SocketAddr>,
    /// Use the registry already running at this address.
    pub address: Option<SocketAddr>,
    /// Heartbeat age after which a server is no longer listed.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listen: None,
            address: None,
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

/// Resolved registry placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    /// Run the registry in-process, listening on the address.
    Embedded(SocketAddr),
    /// Connect to a remote registry.
    Remote(SocketAddr),
}

impl RegistryConfig {
    /// Which registry to use. `None` only for configs that failed validation.
    pub fn mode(&self) -> Option<RegistryMode> {
        match (self.listen, self.address) {
            (Some(listen), None) => Some(RegistryMode::Embedded(listen)),
            (None, Some(address)) => Some(RegistryMode::Remote(address)),
            _ => None,
        }
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Timer configuration for the per-node background tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct TimersConfig {
    /// Seconds between heartbeats to the registry (default: 10).
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Seconds between replication snapshots (default: 30).
    #[serde(default = "default_replication_interval_secs")]
    pub replication_interval_secs: u64,
    /// Requests between clock-resync hooks (default: 10).
    #[serde(default = "default_resync_every")]
    pub resync_every: u32,
    /// Registration attempts at startup before handing over to the heartbeat task.
    #[serde(default = "default_register_attempts")]
    pub register_attempts: u32,
    /// Pause between registration attempts, in milliseconds.
    #[serde(default = "default_register_backoff_ms")]
    pub register_backoff_ms: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            replication_interval_secs: default_replication_interval_secs(),
            resync_every: default_resync_every(),
            register_attempts: default_register_attempts(),
            register_backoff_ms: default_register_backoff_ms(),
        }
    }
}

impl TimersConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn replication_interval(&self) -> Duration {
        Duration::from_secs(self.replication_interval_secs)
    }

    pub fn register_backoff(&self) -> Duration {
        Duration::from_millis(self.register_backoff_ms)
    }
}

/// One application-server node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Server name, also its identity at the registry.
    pub name: String,
    /// Client request listener. Without one the node only takes part in
    /// replication.
    pub listen: Option<SocketAddr>,
    /// Path to the node's redb file. Without one state lives in memory.
    pub database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_toml(
            r#"
[registry]
listen = "127.0.0.1:5559"

[[node]]
name = "alpha"
"#,
        )
        .unwrap();

        assert_eq!(config.metrics_port, 0);
        assert_eq!(config.registry.stale_after_secs, 30);
        assert_eq!(config.timers.heartbeat_interval(), Duration::from_secs(10));
        assert_eq!(config.timers.replication_interval(), Duration::from_secs(30));
        assert_eq!(config.timers.resync_every, 10);
        assert_eq!(config.nodes.len(), 1);
        assert!(config.nodes[0].listen.is_none());
        assert!(config.nodes[0].database.is_none());
    }

    #[test]
    fn test_registry_mode() {
        let embedded = RegistryConfig {
            listen: Some("127.0.0.1:1".parse().unwrap()),
            ..Default::default()
        };
        assert!(matches!(embedded.mode(), Some(RegistryMode::Embedded(_))));

        let remote = RegistryConfig {
            address: Some("127.0.0.1:2".parse().unwrap()),
            ..Default::default()
        };
        assert!(matches!(remote.mode(), Some(RegistryMode::Remote(_))));

        assert!(RegistryConfig::default().mode().is_none());
    }

    #[test]
    fn test_invalid_config_reports_every_problem() {
        let err = Config::from_toml(
            r#"
[timers]
heartbeat_interval_secs = 0
"#,
        )
        .unwrap_err();

        match err {
            ConfigError::Invalid(errors) => assert!(errors.len() >= 3),
            other => panic!("expected validation failure, got {other}"),
        }
    }

    #[test]
    fn test_parse_error() {
        let err = Config::from_toml("metrics_port = \"nine\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
