//! Configuration for a ledger node
//!
//! Values come from an optional TOML file; every field has a default so a
//! node starts with no file at all.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::pow::DEFAULT_DIFFICULTY;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub mining: MiningConfig,
    pub sync: SyncConfig,
    /// Peer addresses as `host:port`
    pub peers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Leading hex zeros required of a proof; every peer must agree on it
    pub difficulty: usize,
    pub workers: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub request_timeout_secs: u64,
    /// Background reconciliation period, 0 disables it
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5,
            interval_secs: 0,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml(&fs::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mining.difficulty == 0 || self.mining.difficulty > 64 {
            return Err(ConfigError::Invalid(format!(
                "mining.difficulty must be between 1 and 64, got {}",
                self.mining.difficulty
            )));
        }

        if self.sync.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.request_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.mining.difficulty, 2);
        assert_eq!(config.mining.workers, 1);
        assert_eq!(config.sync.interval_secs, 0);
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            peers = ["127.0.0.1:5001", "127.0.0.1:5002"]

            [server]
            port = 5003

            [sync]
            interval_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5003);
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.sync.request_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml("[mining]\ndifficulty = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[server]\nport = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load(Some(Path::new("/nonexistent/ledger-node.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
