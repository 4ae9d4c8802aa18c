//! Error types for the shared-directory channel.
//!
//! [`PathError`] covers every way a configured directory or an individual
//! file operation can fail validation. These are configuration errors: they
//! surface once, loudly, and are never turned into a silent no-op.
//! [`ChannelError`] wraps them together with the transient I/O and
//! malformed-data failures the channel meets while polling.

use std::path::PathBuf;

use balatro_types::MessageKind;

/// A path rejected by [`PathGuard`](crate::PathGuard).
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The path was the empty string.
    #[error("path is empty")]
    Empty,

    /// The path is not valid UTF-8 and cannot be checked character by character.
    #[error("path is not valid UTF-8: {path}")]
    NotUtf8 {
        /// Lossy rendering of the rejected path.
        path: String,
    },

    /// The path is longer than [`MAX_PATH_LENGTH`](crate::path_guard::MAX_PATH_LENGTH).
    #[error("path is {length} characters long, limit is {limit}")]
    TooLong {
        /// Length of the rejected path in characters.
        length: usize,
        /// The configured limit.
        limit: usize,
    },

    /// A `..` segment appears somewhere in the path.
    #[error("path contains a parent-directory segment: {path}")]
    Traversal {
        /// The rejected path.
        path: String,
    },

    /// The path contains an ASCII or Unicode control character.
    #[error("path contains control character U+{code:04X}")]
    ControlCharacter {
        /// Code point of the offending character.
        code: u32,
    },

    /// The path contains one of `< > " | ? *`.
    #[error("path contains forbidden character {character:?}")]
    ForbiddenCharacter {
        /// The offending character.
        character: char,
    },

    /// A segment is a reserved device name such as `CON` or `LPT1`.
    #[error("path segment {segment:?} is a reserved device name")]
    ReservedName {
        /// The offending segment.
        segment: String,
    },

    /// The path resolves outside the working directory and carries no
    /// temporary-directory marker.
    #[error("path {path} resolves outside the working directory")]
    OutsideWorkspace {
        /// The resolved path.
        path: PathBuf,
    },

    /// The path could not be resolved against the filesystem.
    #[error("cannot resolve {path}: {source}")]
    Resolve {
        /// The path being resolved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file operation targets something outside the channel directory.
    #[error("{path} is outside the channel directory {base}")]
    OutsideBase {
        /// The resolved target.
        path: PathBuf,
        /// The resolved channel directory.
        base: PathBuf,
    },

    /// A file operation targets an extension not on the allow-list.
    #[error("extension {extension:?} is not allowed for {path}")]
    DisallowedExtension {
        /// The rejected file.
        path: PathBuf,
        /// Its extension.
        extension: String,
    },

    /// A file operation targets a symbolic link.
    #[error("{path} is a symbolic link")]
    Symlink {
        /// The rejected file.
        path: PathBuf,
    },
}

/// Errors raised by [`MessageChannel`](crate::MessageChannel).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The base directory or a file operation failed path validation.
    #[error("configuration error: {0}")]
    Configuration(#[from] PathError),

    /// A file could not be read, written, renamed or removed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file did not contain a well-formed envelope or payload.
    #[error("malformed message in {path}: {source}")]
    Malformed {
        /// The file involved.
        path: PathBuf,
        /// The JSON error.
        source: serde_json::Error,
    },

    /// A file held an envelope of the wrong kind.
    #[error("expected a {expected} message in {path}, found {found}")]
    UnexpectedKind {
        /// The file involved.
        path: PathBuf,
        /// The kind this file carries.
        expected: MessageKind,
        /// The kind actually found.
        found: MessageKind,
    },

    /// An outgoing envelope could not be serialized.
    #[error("failed to serialize {kind} message: {source}")]
    Serialize {
        /// The kind being written.
        kind: MessageKind,
        /// The JSON error.
        source: serde_json::Error,
    },
}

impl ChannelError {
    /// Whether this error stems from path validation rather than from the
    /// data or the filesystem.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
