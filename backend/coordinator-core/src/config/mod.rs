use crate::error::config::ConfigError;
use crate::{
    DEFAULT_CAPACITY, DEFAULT_COMMAND_ADDR, DEFAULT_LOCAL_SOCKET_PATH, DEFAULT_WEBSOCKET_ADDR,
};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "coordinator.json";
const CONFIG_VERSION: u32 = 1;

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebSocketConfig {
    #[serde(default = "default_websocket_addr")]
    pub bind_addr: String,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_websocket_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    #[serde(default = "default_command_addr")]
    pub network_addr: String,
    #[serde(default = "default_local_socket_path")]
    pub local_socket_path: PathBuf,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            network_addr: default_command_addr(),
            local_socket_path: default_local_socket_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Live connection count at which the threshold trigger fires.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EvictionConfig {
    #[serde(default = "default_close_ack_timeout", with = "human_duration")]
    pub close_ack_timeout: Duration,
    #[serde(default = "default_drain_timeout", with = "human_duration")]
    pub drain_timeout: Duration,
    #[serde(default = "default_drain_poll_interval", with = "human_duration")]
    pub drain_poll_interval: Duration,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            close_ack_timeout: default_close_ack_timeout(),
            drain_timeout: default_drain_timeout(),
            drain_poll_interval: default_drain_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CoordinatorConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub command: CommandConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub eviction: EvictionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            websocket: WebSocketConfig::default(),
            command: CommandConfig::default(),
            registry: RegistryConfig::default(),
            eviction: EvictionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_websocket_addr() -> String {
    DEFAULT_WEBSOCKET_ADDR.to_string()
}
fn default_command_addr() -> String {
    DEFAULT_COMMAND_ADDR.to_string()
}
fn default_local_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOCAL_SOCKET_PATH)
}
fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_close_ack_timeout() -> Duration {
    Duration::from_secs(2)
}
fn default_drain_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_drain_poll_interval() -> Duration {
    Duration::from_millis(100)
}
fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

/// Durations are written the way operators type them: `"5s"`, `"100ms"`.
mod human_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================
// IMPLEMENTATION
// ============================================

impl CoordinatorConfig {
    /// Load config from `{config_dir}/coordinator.json`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read, parsed, or validated is an error: the coordinator refuses to start
    /// on a config the operator wrote but we cannot honor.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::caller(),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config = Self::from_json(&contents).map_err(|e| match e {
            ConfigError::ParseError { reason, location, .. } => ConfigError::ParseError {
                location,
                path: config_path.clone(),
                reason,
            },
            other => other,
        })?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a config document.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: CoordinatorConfig = serde_json::from_str(contents).map_err(|e| {
            warn!("Failed to parse config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::caller(),
                path: PathBuf::from(CONFIG_FILE_NAME),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        validate_socket_addr("websocket.bind_addr", &self.websocket.bind_addr)?;
        validate_socket_addr("command.network_addr", &self.command.network_addr)?;

        if self.command.local_socket_path.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "command.local_socket_path cannot be empty",
            ));
        }

        if self.registry.capacity == 0 {
            return Err(ConfigError::validation(
                "registry.capacity must be at least 1",
            ));
        }

        let eviction = &self.eviction;
        for (name, value) in [
            ("eviction.close_ack_timeout", eviction.close_ack_timeout),
            ("eviction.drain_timeout", eviction.drain_timeout),
            ("eviction.drain_poll_interval", eviction.drain_poll_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::validation(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        if eviction.drain_poll_interval > eviction.drain_timeout {
            return Err(ConfigError::validation(format!(
                "eviction.drain_poll_interval ({:?}) exceeds eviction.drain_timeout ({:?})",
                eviction.drain_poll_interval, eviction.drain_timeout
            )));
        }

        Ok(())
    }
}

#[track_caller]
fn validate_socket_addr(name: &str, value: &str) -> Result<(), ConfigError> {
    value
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| ConfigError::validation(format!("Invalid {name} '{value}': {e}")))
}
