//! File-based message channel over a shared directory.
//!
//! The two processes share no memory, so the channel relies on two
//! primitives only:
//!
//! - **Atomic rename.** Commands are written to a `.tmp` sibling, flushed,
//!   then renamed over the command file. A reader never sees a half-written
//!   command.
//! - **Sequence numbers.** Every envelope carries a writer-local, strictly
//!   increasing `sequence_id`. The channel remembers the last id it accepted
//!   per (file, kind) and ignores anything at or below it, so re-reading an
//!   unchanged file yields nothing.
//!
//! Every individual read, write, rename and delete is checked by the
//! [`PathGuard`] first.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use balatro_types::{ActionRequest, ActionResult, Envelope, MessageKind, Snapshot};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::path_guard::PathGuard;
use crate::transport::{self, Transport};

/// The three well-known files in the shared directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelFile {
    /// Written by the peer, read by the bridge.
    State,
    /// Written by the bridge, read by the peer.
    Command,
    /// Written by the peer, read and then deleted by the bridge.
    Result,
}

impl ChannelFile {
    /// All three files.
    pub const ALL: [Self; 3] = [Self::State, Self::Command, Self::Result];
}

/// A command written to the temp sibling but not yet renamed into place.
#[derive(Debug)]
pub(crate) struct StagedCommand {
    temp: PathBuf,
    sequence_id: u64,
}

/// Owner of the shared directory's state, command and result files.
#[derive(Debug)]
pub struct MessageChannel {
    guard: PathGuard,
    state_path: PathBuf,
    command_path: PathBuf,
    result_path: PathBuf,
    temp_path: PathBuf,
    poll_interval: Duration,
    sequence_counter: u64,
    last_accepted: BTreeMap<(ChannelFile, MessageKind), u64>,
    /// Sequence id of the most recent command written, 0 before the first.
    last_command_sequence: u64,
}

impl MessageChannel {
    /// Validate the configured directory, create it, and open a channel on it.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Configuration`] if the base path or any of the
    /// file names fails validation, or [`ChannelError::Io`] if the directory
    /// cannot be created.
    pub fn open(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let guard = PathGuard::new(&config.base_path)?;
        Self::with_guard(guard, config)
    }

    /// Open a channel on an already validated directory.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open), minus validation of the base path.
    pub fn with_guard(guard: PathGuard, config: &ChannelConfig) -> Result<Self, ChannelError> {
        std::fs::create_dir_all(guard.base()).map_err(ChannelError::io(guard.base()))?;

        let base = guard.base();
        let state_path = guard.validate_operation(&base.join(&config.state_file))?;
        let command_path = guard.validate_operation(&base.join(&config.command_file))?;
        let result_path = guard.validate_operation(&base.join(&config.result_file))?;
        let temp_path = guard.validate_operation(&command_path.with_extension("tmp"))?;

        info!(
            base = %base.display(),
            state = %state_path.display(),
            command = %command_path.display(),
            result = %result_path.display(),
            "message channel opened"
        );

        Ok(Self {
            guard,
            state_path,
            command_path,
            result_path,
            temp_path,
            poll_interval: config.poll_interval(),
            sequence_counter: 0,
            last_accepted: BTreeMap::new(),
            last_command_sequence: 0,
        })
    }

    /// The shared directory, as configured.
    pub fn base_directory(&self) -> &Path {
        self.guard.base()
    }

    /// Path of one of the three channel files.
    pub fn path_of(&self, file: ChannelFile) -> &Path {
        match file {
            ChannelFile::State => &self.state_path,
            ChannelFile::Command => &self.command_path,
            ChannelFile::Result => &self.result_path,
        }
    }

    /// Path of the temp sibling used for atomic command writes.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Highest sequence id accepted so far from `file`, if any.
    pub fn last_accepted(&self, file: ChannelFile) -> Option<u64> {
        let kind = expected_kind(file);
        self.last_accepted.get(&(file, kind)).copied()
    }

    /// Write a command, reporting why it failed if it did.
    ///
    /// Returns the sequence id the command was written with.
    ///
    /// # Errors
    ///
    /// Returns the validation, serialization or I/O failure that stopped the
    /// write. The command file is left untouched in every case.
    pub fn try_write_command(&mut self, action: &ActionRequest) -> Result<u64, ChannelError> {
        let staged = self.stage_command(action)?;
        let sequence_id = staged.sequence_id;
        self.commit(staged)?;
        self.last_command_sequence = sequence_id;
        debug!(
            sequence_id,
            action_type = %action.action_type(),
            "command written"
        );
        Ok(sequence_id)
    }

    /// Read the state file, reporting why nothing usable was found.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] for unreadable files, malformed envelopes
    /// and envelopes of the wrong kind. A missing file is `Ok(None)`.
    pub fn try_read_state(&mut self) -> Result<Option<Snapshot>, ChannelError> {
        let accepted = self.accept::<Snapshot>(ChannelFile::State)?;
        Ok(accepted.map(|(sequence_id, snapshot)| {
            debug!(
                sequence_id,
                session_id = %snapshot.session_id,
                phase = %snapshot.current_phase,
                "state accepted"
            );
            snapshot
        }))
    }

    /// Read and consume the result file, reporting why nothing usable was found.
    ///
    /// An accepted result is deleted. A result older than the last command
    /// written is deleted and dropped.
    ///
    /// # Errors
    ///
    /// As for [`try_read_state`](Self::try_read_state), plus a failure to
    /// delete the consumed file.
    pub fn try_read_result(&mut self) -> Result<Option<ActionResult>, ChannelError> {
        let Some((sequence_id, result)) = self.accept::<ActionResult>(ChannelFile::Result)? else {
            return Ok(None);
        };

        self.remove(ChannelFile::Result)?;

        if sequence_id < self.last_command_sequence {
            warn!(
                path = %self.result_path.display(),
                sequence_id,
                command_sequence = self.last_command_sequence,
                "discarding result older than the last command"
            );
            return Ok(None);
        }

        debug!(sequence_id, success = result.success, "result accepted");
        Ok(Some(result))
    }

    /// Poll for a result using this channel's configured interval.
    pub async fn wait_for_result(&mut self, timeout: Duration) -> Option<ActionResult> {
        transport::wait_for_result(self, timeout).await
    }

    /// Serialize `action` into the temp sibling without publishing it.
    pub(crate) fn stage_command(
        &mut self,
        action: &ActionRequest,
    ) -> Result<StagedCommand, ChannelError> {
        let sequence_id = self.next_sequence_id();
        let envelope = Envelope::new(sequence_id, MessageKind::Command, action);
        let json = serde_json::to_string_pretty(&envelope).map_err(|source| {
            ChannelError::Serialize {
                kind: MessageKind::Command,
                source,
            }
        })?;

        let temp = self.guard.validate_operation(&self.temp_path)?;
        let mut file = File::create(&temp).map_err(ChannelError::io(&temp))?;
        file.write_all(json.as_bytes())
            .map_err(ChannelError::io(&temp))?;
        file.sync_all().map_err(ChannelError::io(&temp))?;

        Ok(StagedCommand { temp, sequence_id })
    }

    /// Rename a staged command over the command file.
    pub(crate) fn commit(&self, staged: StagedCommand) -> Result<(), ChannelError> {
        let target = self.guard.validate_operation(&self.command_path)?;
        if let Err(source) = std::fs::rename(&staged.temp, &target) {
            if let Err(e) = std::fs::remove_file(&staged.temp) {
                debug!(path = %staged.temp.display(), error = %e, "temp file cleanup failed");
            }
            return Err(ChannelError::Io {
                path: target,
                source,
            });
        }
        Ok(())
    }

    /// Parse `file`, check kind and sequence, and record it as accepted.
    ///
    /// A missing file is `Ok(None)`; an envelope at or below the last
    /// accepted id is `Ok(None)`. The id is recorded only once the payload
    /// has been decoded.
    fn accept<T: DeserializeOwned>(
        &mut self,
        file: ChannelFile,
    ) -> Result<Option<(u64, T)>, ChannelError> {
        let kind = expected_kind(file);
        let path = self.guard.validate_operation(self.path_of(file))?;

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ChannelError::Io { path, source }),
        };

        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(&raw).map_err(|source| ChannelError::Malformed {
                path: path.clone(),
                source,
            })?;

        if envelope.message_type != kind {
            return Err(ChannelError::UnexpectedKind {
                path,
                expected: kind,
                found: envelope.message_type,
            });
        }

        let last = self.last_accepted.get(&(file, kind)).copied().unwrap_or(0);
        if envelope.sequence_id <= last {
            debug!(
                sequence_id = envelope.sequence_id,
                last_accepted = last,
                file = ?file,
                "already processed"
            );
            return Ok(None);
        }

        let payload: T = serde_json::from_value(envelope.data)
            .map_err(|source| ChannelError::Malformed { path, source })?;

        self.last_accepted.insert((file, kind), envelope.sequence_id);
        Ok(Some((envelope.sequence_id, payload)))
    }

    /// Delete one channel file. A file that is already gone is not an error.
    fn remove(&self, file: ChannelFile) -> Result<(), ChannelError> {
        let path = self.guard.validate_operation(self.path_of(file))?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ChannelError::Io { path, source }),
        }
    }

    /// Remove `path` if it exists and is older than `max_age`.
    fn remove_if_stale(&self, path: &Path, max_age: Duration) -> Result<bool, ChannelError> {
        let path = self.guard.validate_operation(path)?;
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(ChannelError::Io { path, source }),
        };

        // A modification time in the future counts as fresh.
        let Ok(age) = SystemTime::now().duration_since(modified) else {
            return Ok(false);
        };
        if age <= max_age {
            return Ok(false);
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removed stale file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ChannelError::Io { path, source }),
        }
    }
}

impl Transport for MessageChannel {
    fn next_sequence_id(&mut self) -> u64 {
        self.sequence_counter = self.sequence_counter.saturating_add(1);
        self.sequence_counter
    }

    fn read_state(&mut self) -> Option<Snapshot> {
        self.try_read_state()
            .unwrap_or_else(|e| log_read_failure(ChannelFile::State, &e))
    }

    fn write_command(&mut self, action: &ActionRequest) -> bool {
        match self.try_write_command(action) {
            Ok(_) => true,
            Err(e) => {
                error!(
                    action_type = %action.action_type(),
                    error = %e,
                    "failed to write command"
                );
                false
            }
        }
    }

    fn read_result(&mut self) -> Option<ActionResult> {
        self.try_read_result()
            .unwrap_or_else(|e| log_read_failure(ChannelFile::Result, &e))
    }

    fn cleanup_stale(&mut self, max_age: Duration) -> usize {
        let targets = ChannelFile::ALL
            .iter()
            .map(|f| self.path_of(*f))
            .chain(std::iter::once(self.temp_path.as_path()));

        let mut removed: usize = 0;
        for path in targets {
            match self.remove_if_stale(path, max_age) {
                Ok(true) => removed = removed.saturating_add(1),
                Ok(false) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping file during cleanup"),
            }
        }
        removed
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

const fn expected_kind(file: ChannelFile) -> MessageKind {
    match file {
        ChannelFile::State => MessageKind::State,
        ChannelFile::Command => MessageKind::Command,
        ChannelFile::Result => MessageKind::Result,
    }
}

/// Log a failed read at a level matching its cause and turn it into "no data".
fn log_read_failure<T>(file: ChannelFile, e: &ChannelError) -> Option<T> {
    if e.is_configuration() {
        error!(file = ?file, error = %e, "channel file failed validation");
    } else {
        warn!(file = ?file, error = %e, "ignoring unreadable channel file");
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn open_channel() -> (tempfile::TempDir, MessageChannel) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("shared");
        let config = ChannelConfig::with_base_path(base.to_string_lossy());
        let channel = MessageChannel::open(&config).unwrap();
        (dir, channel)
    }

    #[test]
    fn open_creates_directory_and_names_files() {
        let (dir, channel) = open_channel();
        assert!(dir.path().join("shared").is_dir());
        assert!(channel.path_of(ChannelFile::State).ends_with("state.json"));
        assert!(channel.path_of(ChannelFile::Command).ends_with("command.json"));
        assert!(channel.path_of(ChannelFile::Result).ends_with("result.json"));
        assert!(channel.temp_path().ends_with("command.tmp"));
    }

    #[test]
    fn open_rejects_disallowed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ChannelConfig::with_base_path(dir.path().join("shared").to_string_lossy());
        config.result_file = "result.exe".to_owned();
        let err = MessageChannel::open(&config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn sequence_ids_strictly_increase() {
        let (_dir, mut channel) = open_channel();
        assert_eq!(channel.next_sequence_id(), 1);
        assert_eq!(channel.next_sequence_id(), 2);
        assert_eq!(channel.next_sequence_id(), 3);
    }

    #[test]
    fn staged_command_is_invisible_until_commit() {
        let (_dir, mut channel) = open_channel();
        let command = channel.path_of(ChannelFile::Command).to_path_buf();

        channel.try_write_command(&ActionRequest::GoToShop).unwrap();
        let before = std::fs::read_to_string(&command).unwrap();

        let staged = channel.stage_command(&ActionRequest::RerollShop).unwrap();
        assert!(channel.temp_path().exists());
        assert_eq!(std::fs::read_to_string(&command).unwrap(), before);

        channel.commit(staged).unwrap();
        assert!(!channel.temp_path().exists());

        let after: Envelope<ActionRequest> =
            serde_json::from_str(&std::fs::read_to_string(&command).unwrap()).unwrap();
        assert_eq!(after.sequence_id, 2);
        assert_eq!(after.message_type, MessageKind::Command);
        assert_eq!(after.data, ActionRequest::RerollShop);
    }

    #[test]
    fn write_command_produces_complete_envelope() {
        let (_dir, mut channel) = open_channel();
        assert!(channel.write_command(&ActionRequest::BuyItem { shop_index: 1 }));

        let raw = std::fs::read_to_string(channel.path_of(ChannelFile::Command)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["message_type"], "command");
        assert_eq!(value["sequence_id"], 1);
        assert_eq!(value["data"]["action_type"], "buy_item");
        assert_eq!(value["data"]["shop_index"], 1);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn write_command_reports_failure_instead_of_panicking() {
        let (dir, mut channel) = open_channel();
        std::fs::remove_dir_all(dir.path().join("shared")).unwrap();
        assert!(!channel.write_command(&ActionRequest::GoToShop));
    }
}
