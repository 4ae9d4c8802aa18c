//! Validation of the shared directory and of every file operation inside it.
//!
//! Directory validation runs these stages in order, stopping at the first
//! failure:
//! 1. Empty / non-UTF-8 input
//! 2. Length limit
//! 3. Lexical checks: `..` segments, control characters, `< > " | ? *`,
//!    reserved device names
//! 4. Containment: the resolved path must sit under the working directory,
//!    or carry a temporary/test marker
//!
//! Per-operation validation ([`PathGuard::validate_operation`]) re-runs the
//! lexical checks on the target, then requires it to resolve inside the
//! validated base directory, to carry an allowed extension, and not to be a
//! symbolic link.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Longest accepted path, in characters.
pub const MAX_PATH_LENGTH: usize = 260;

/// Extensions a channel file may carry.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["json", "tmp"];

const FORBIDDEN_CHARACTERS: [char; 6] = ['<', '>', '"', '|', '?', '*'];

const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Prefixes that mark a path component as scratch space for tests.
///
/// Matched at the start of a component only, so `attempts` or `latest`
/// carry no marker.
const TEMP_MARKERS: [&str; 4] = ["tmp", ".tmp", "temp", "test"];

/// A validated channel directory.
///
/// Construction is the only place a bad base path can be reported; once a
/// guard exists, its base is known to be safe.
#[derive(Debug, Clone)]
pub struct PathGuard {
    /// The base as configured (relative paths stay relative).
    base: PathBuf,
    /// The base after symlink resolution, used for containment checks.
    resolved_base: PathBuf,
    /// Working directory the base was validated against.
    root: PathBuf,
}

impl PathGuard {
    /// Validate `raw` against the process working directory.
    pub fn new(raw: impl AsRef<Path>) -> Result<Self, PathError> {
        let cwd = std::env::current_dir().map_err(|source| PathError::Resolve {
            path: PathBuf::from("."),
            source,
        })?;
        Self::with_root(raw, &cwd)
    }

    /// Validate `raw` against an explicit working directory.
    pub fn with_root(raw: impl AsRef<Path>, cwd: &Path) -> Result<Self, PathError> {
        let root = resolve(cwd)?;
        let base = validate_in(raw.as_ref(), &root)?;
        let resolved_base = resolve(&root.join(&base))?;
        Ok(Self {
            base,
            resolved_base,
            root,
        })
    }

    /// The validated base directory, in the form later operations use.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The base directory after symlink resolution.
    pub fn resolved_base(&self) -> &Path {
        &self.resolved_base
    }

    /// Check a single file operation before it touches the disk.
    ///
    /// `file` is interpreted like the base: relative paths are taken against
    /// the working directory the guard was built with. Returns the path to
    /// operate on, unchanged.
    pub fn validate_operation(&self, file: &Path) -> Result<PathBuf, PathError> {
        let text = as_text(file)?;
        check_lexical(text)?;

        let absolute = self.root.join(file);

        // Before resolution, which would follow the link.
        if let Ok(meta) = std::fs::symlink_metadata(&absolute)
            && meta.file_type().is_symlink()
        {
            return Err(PathError::Symlink {
                path: file.to_path_buf(),
            });
        }

        let resolved = resolve(&absolute)?;
        if resolved == self.resolved_base || !resolved.starts_with(&self.resolved_base) {
            return Err(PathError::OutsideBase {
                path: resolved,
                base: self.resolved_base.clone(),
            });
        }

        if let Some(ext) = file.extension() {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(PathError::DisallowedExtension {
                    path: file.to_path_buf(),
                    extension: ext,
                });
            }
        }

        Ok(file.to_path_buf())
    }
}

/// Validate a directory path against the process working directory.
///
/// Relative input is returned in its original relative form; absolute input
/// is returned resolved.
pub fn validate(raw: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    let cwd = std::env::current_dir().map_err(|source| PathError::Resolve {
        path: PathBuf::from("."),
        source,
    })?;
    validate_in(raw.as_ref(), &resolve(&cwd)?)
}

/// Validate a directory path against an explicit, already resolved,
/// working directory.
pub fn validate_in(raw: &Path, cwd: &Path) -> Result<PathBuf, PathError> {
    // Stage 1: presence
    let text = as_text(raw)?;
    if text.is_empty() {
        return Err(PathError::Empty);
    }

    // Stage 2 + 3: length and lexical content
    check_lexical(text)?;

    // Stage 4: containment
    if raw.is_absolute() {
        let resolved = resolve(raw)?;
        if resolved.starts_with(cwd) || has_temp_marker(&resolved) || has_temp_marker(raw) {
            Ok(resolved)
        } else {
            Err(PathError::OutsideWorkspace { path: resolved })
        }
    } else {
        let resolved = resolve(&cwd.join(raw))?;
        if resolved.starts_with(cwd) || has_temp_marker(&resolved) {
            Ok(raw.to_path_buf())
        } else {
            Err(PathError::OutsideWorkspace { path: resolved })
        }
    }
}

fn as_text(path: &Path) -> Result<&str, PathError> {
    path.to_str().ok_or_else(|| PathError::NotUtf8 {
        path: path.to_string_lossy().into_owned(),
    })
}

/// Length, traversal, character and reserved-name checks on the raw text.
fn check_lexical(text: &str) -> Result<(), PathError> {
    let length = text.chars().count();
    if length > MAX_PATH_LENGTH {
        return Err(PathError::TooLong {
            length,
            limit: MAX_PATH_LENGTH,
        });
    }

    // Both separator styles, whatever the host platform.
    let segments = || text.split(['/', '\\']);

    if segments().any(|s| s == "..") {
        return Err(PathError::Traversal {
            path: text.to_owned(),
        });
    }

    if let Some(c) = text.chars().find(|c| c.is_control()) {
        return Err(PathError::ControlCharacter { code: u32::from(c) });
    }

    if let Some(c) = text.chars().find(|c| FORBIDDEN_CHARACTERS.contains(c)) {
        return Err(PathError::ForbiddenCharacter { character: c });
    }

    if let Some(segment) = segments().find(|s| is_reserved_name(s)) {
        return Err(PathError::ReservedName {
            segment: segment.to_owned(),
        });
    }

    Ok(())
}

/// `CON`, `con`, and `Con.json` are all reserved; `console` is not.
fn is_reserved_name(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment);
    RESERVED_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
}

fn has_temp_marker(path: &Path) -> bool {
    let temp_dir = std::env::temp_dir();
    if path.starts_with(&temp_dir) || resolve(&temp_dir).is_ok_and(|t| path.starts_with(t)) {
        return true;
    }
    path.components().any(|component| match component {
        Component::Normal(part) => {
            let part = part.to_string_lossy().to_ascii_lowercase();
            TEMP_MARKERS.iter().any(|marker| part.starts_with(marker))
        }
        _ => false,
    })
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest,
/// so directories that do not exist yet can still be checked.
fn resolve(path: &Path) -> Result<PathBuf, PathError> {
    let mut existing = path;
    let mut pending: Vec<OsString> = Vec::new();

    loop {
        match std::fs::canonicalize(existing) {
            Ok(mut resolved) => {
                resolved.extend(pending.iter().rev());
                return Ok(resolved);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        pending.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => {
                        return Err(PathError::Resolve {
                            path: path.to_path_buf(),
                            source: e,
                        });
                    }
                }
            }
            Err(source) => {
                return Err(PathError::Resolve {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}
