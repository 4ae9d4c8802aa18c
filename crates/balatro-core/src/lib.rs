//! State reconciliation and command admission for the Balatro file bridge.
//!
//! This crate sits on top of the [`balatro_ipc`] transport and owns
//! everything that needs the peer's state: the cached snapshot and its
//! change detection, the rules deciding which commands may be sent, and the
//! execute/monitor loop that ties them together.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `bridge-config.yaml` into
//!   strongly-typed structs.
//! - [`gate`] -- [`validate_action`] and [`RejectionReason`].
//! - [`orchestrator`] -- [`Orchestrator`]: execute a command end to end, run
//!   the background monitor.
//! - [`state`] -- [`StateCache`] with projection-based change detection and
//!   transition checks.
//!
//! [`validate_action`]: gate::validate_action
//! [`RejectionReason`]: gate::RejectionReason
//! [`Orchestrator`]: orchestrator::Orchestrator
//! [`StateCache`]: state::StateCache

pub mod config;
pub mod gate;
pub mod orchestrator;
pub mod state;
