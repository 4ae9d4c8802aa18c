//! Shared-directory message channel for the Balatro file bridge.
//!
//! The bridge and the game-side peer exchange three JSON files in one
//! directory: the peer publishes state snapshots and command results, the
//! bridge publishes commands. This crate owns that exchange and the path
//! checks that keep it inside the directory.
//!
//! # Modules
//!
//! - [`channel`] -- [`MessageChannel`]: atomic writes, sequence dedup,
//!   result consumption and stale-file cleanup.
//! - [`config`] -- [`ChannelConfig`], the `channel` section of the bridge
//!   configuration.
//! - [`error`] -- [`PathError`] and [`ChannelError`].
//! - [`path_guard`] -- [`PathGuard`] and the free-standing path validators.
//! - [`transport`] -- The [`Transport`] trait and the bounded
//!   [`wait_for_result`] poll loop.

pub mod channel;
pub mod config;
pub mod error;
pub mod path_guard;
pub mod transport;

pub use channel::{ChannelFile, MessageChannel};
pub use config::ChannelConfig;
pub use error::{ChannelError, PathError};
pub use path_guard::PathGuard;
pub use transport::{Transport, wait_for_result};
