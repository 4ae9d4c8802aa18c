//! Channel configuration.
//!
//! Mirrors the `channel` section of `bridge-config.yaml`. Every field has a
//! default so an empty section (or none at all) yields a working channel
//! rooted at `./shared`.

use std::time::Duration;

use serde::Deserialize;

/// Where the shared directory lives and how it is polled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelConfig {
    /// Directory shared with the peer.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// File the peer writes state snapshots to.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// File the bridge writes commands to.
    #[serde(default = "default_command_file")]
    pub command_file: String,

    /// File the peer writes command results to.
    #[serde(default = "default_result_file")]
    pub result_file: String,

    /// Delay between polls while waiting for a result.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for a result before giving up.
    #[serde(default = "default_result_timeout_ms")]
    pub result_timeout_ms: u64,
}

impl ChannelConfig {
    /// Defaults with a different base directory.
    pub fn with_base_path(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// [`poll_interval_ms`](Self::poll_interval_ms) as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// [`result_timeout_ms`](Self::result_timeout_ms) as a [`Duration`].
    pub const fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            state_file: default_state_file(),
            command_file: default_command_file(),
            result_file: default_result_file(),
            poll_interval_ms: default_poll_interval_ms(),
            result_timeout_ms: default_result_timeout_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_base_path() -> String {
    "shared".to_owned()
}

fn default_state_file() -> String {
    "state.json".to_owned()
}

fn default_command_file() -> String {
    "command.json".to_owned()
}

fn default_result_file() -> String {
    "result.json".to_owned()
}

const fn default_poll_interval_ms() -> u64 {
    100
}

const fn default_result_timeout_ms() -> u64 {
    10_000
}
