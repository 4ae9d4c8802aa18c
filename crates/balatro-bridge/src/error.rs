//! Error types for the bridge binary.
//!
//! [`BridgeError`] covers the failures that stop the process: bad
//! configuration, an unusable shared directory, or a broken stdout.
//! Everything that goes wrong with an individual request is reported on
//! stdout instead and never reaches this type.

/// Top-level error for the bridge binary.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: balatro_core::config::ConfigError,
    },

    /// The shared directory could not be opened.
    #[error("channel error: {source}")]
    Channel {
        /// The underlying channel error.
        #[from]
        source: balatro_ipc::ChannelError,
    },

    /// Reading stdin or writing stdout failed.
    #[error("stdio error: {source}")]
    Stdio {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A response could not be serialized.
    #[error("serialization error: {source}")]
    Serialize {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
