//! Configuration loading for the bridge.
//!
//! The configuration lives in `bridge-config.yaml` next to the binary's
//! working directory. Every section and field has a default, so a missing
//! file is not an error: the bridge runs on `./shared` with the stock
//! timings.

use std::path::Path;

use balatro_ipc::ChannelConfig;
use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level bridge configuration.
///
/// Mirrors the structure of `bridge-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BridgeConfig {
    /// Shared directory and polling settings.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Background state monitor.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `BRIDGE_SHARED_PATH` overrides `channel.base_path`
    /// - `BRIDGE_RESULT_TIMEOUT_MS` overrides `channel.result_timeout_ms`
    /// - `BRIDGE_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields the
    /// defaults (with environment overrides applied).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the file exists and is not valid
    /// YAML, or [`ConfigError::Io`] for read failures other than not-found.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `BRIDGE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BRIDGE_SHARED_PATH") {
            self.channel.base_path = val;
        }
        if let Ok(val) = std::env::var("BRIDGE_RESULT_TIMEOUT_MS") {
            match val.parse() {
                Ok(ms) => self.channel.result_timeout_ms = ms,
                Err(_) => warn!(value = %val, "ignoring non-numeric BRIDGE_RESULT_TIMEOUT_MS"),
            }
        }
        if let Ok(val) = std::env::var("BRIDGE_LOG_LEVEL") {
            self.logging.level = val;
        }
    }
}

/// Background monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitorConfig {
    /// Whether the monitor loop runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between monitor iterations.
    #[serde(default = "default_monitor_interval_ms")]
    pub interval_ms: u64,

    /// Channel files older than this many seconds are deleted.
    #[serde(default = "default_stale_max_age_secs")]
    pub stale_max_age_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_monitor_interval_ms(),
            stale_max_age_secs: default_stale_max_age_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_monitor_interval_ms() -> u64 {
    1_000
}

const fn default_stale_max_age_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_owned()
}
