//! Command execution and the background monitor.
//!
//! [`Orchestrator::execute`] is the single entry point for sending a command:
//!
//! 1. Pull the latest snapshot through the [`StateCache`]
//! 2. Check the command against it with [`validate_action`]
//! 3. Write the command
//! 4. Poll for the result, bounded by the configured timeout
//! 5. Fold a successful result's snapshot back into the cache
//!
//! Every step that can fail has its own [`ExecuteError`] variant, so a
//! rejection, a write failure and a timeout stay distinguishable from each
//! other and from a failure the peer reports.

use std::future::Future;
use std::time::Duration;

use balatro_ipc::{Transport, wait_for_result};
use balatro_types::{ActionRequest, ActionResult, ActionType, Snapshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::gate::{self, RejectionReason, validate_action};
use crate::state::{StateCache, StateSummary};

/// Why a command did not produce a peer result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    /// No snapshot has been received yet, so nothing can be validated.
    #[error("no game state available")]
    NoSnapshot,

    /// The command failed admission control.
    #[error("invalid action: {0}")]
    Rejected(#[from] RejectionReason),

    /// The command file could not be written.
    #[error("failed to send {action} command")]
    WriteFailed {
        /// The command that was not sent.
        action: ActionType,
    },

    /// The peer did not answer in time.
    #[error("no result for {action} within {timeout_ms} ms")]
    Timeout {
        /// The command that went unanswered.
        action: ActionType,
        /// The timeout that elapsed.
        timeout_ms: u128,
    },
}

impl ExecuteError {
    /// Render as the failed-result shape callers of the bridge expect.
    pub fn to_action_result(&self) -> ActionResult {
        ActionResult::failure(self.to_string())
    }
}

/// What one monitor iteration observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTick {
    /// Whether the state changed since the previous iteration.
    pub changed: bool,
    /// Digest of the cached state after polling.
    pub summary: Option<StateSummary>,
    /// Stale channel files deleted.
    pub removed: usize,
}

/// Wires the state cache, the gate and the transport together.
#[derive(Debug)]
pub struct Orchestrator<T: Transport> {
    cache: StateCache<T>,
    result_timeout: Duration,
    stale_max_age: Duration,
}

impl<T: Transport> Orchestrator<T> {
    /// Default age after which channel files are considered stale.
    pub const DEFAULT_STALE_MAX_AGE: Duration = Duration::from_secs(300);

    /// An orchestrator over `transport` that waits `result_timeout` for results.
    pub const fn new(transport: T, result_timeout: Duration) -> Self {
        Self {
            cache: StateCache::new(transport),
            result_timeout,
            stale_max_age: Self::DEFAULT_STALE_MAX_AGE,
        }
    }

    /// An orchestrator using the timings in `config`.
    pub const fn from_config(transport: T, config: &BridgeConfig) -> Self {
        Self {
            cache: StateCache::new(transport),
            result_timeout: config.channel.result_timeout(),
            stale_max_age: Duration::from_secs(config.monitor.stale_max_age_secs),
        }
    }

    /// Override the stale-file age used by [`monitor_tick`](Self::monitor_tick).
    #[must_use]
    pub const fn with_stale_max_age(mut self, max_age: Duration) -> Self {
        self.stale_max_age = max_age;
        self
    }

    /// The state cache.
    pub const fn cache(&self) -> &StateCache<T> {
        &self.cache
    }

    /// The state cache, mutably.
    pub const fn cache_mut(&mut self) -> &mut StateCache<T> {
        &mut self.cache
    }

    /// The latest snapshot, polling the transport first.
    pub fn current_state(&mut self) -> Option<&Snapshot> {
        self.cache.get_current()
    }

    /// The actions the peer currently accepts, polling the transport first.
    pub fn available_actions(&mut self) -> Vec<String> {
        self.cache
            .get_current()
            .map(gate::available_actions)
            .unwrap_or_default()
    }

    /// Digest of the latest snapshot, polling the transport first.
    pub fn summary(&mut self) -> Option<StateSummary> {
        self.cache.get_current();
        self.cache.summary()
    }

    /// Validate, send and await one command.
    ///
    /// A failure reported by the peer is `Ok` with `success == false`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError`] if there is no snapshot, the command is
    /// rejected, the command cannot be written, or no result arrives in time.
    pub async fn execute(&mut self, action: &ActionRequest) -> Result<ActionResult, ExecuteError> {
        let action_type = action.action_type();

        let snapshot = self.cache.get_current().ok_or(ExecuteError::NoSnapshot)?;
        if let Err(reason) = validate_action(action, snapshot) {
            info!(action = %action_type, %reason, "action rejected");
            return Err(reason.into());
        }

        let transport = self.cache.transport_mut();
        if !transport.write_command(action) {
            return Err(ExecuteError::WriteFailed {
                action: action_type,
            });
        }
        debug!(action = %action_type, "command sent, awaiting result");

        let result = wait_for_result(transport, self.result_timeout)
            .await
            .ok_or_else(|| ExecuteError::Timeout {
                action: action_type,
                timeout_ms: self.result_timeout.as_millis(),
            })?;

        Ok(self.process_result(action_type, result))
    }

    /// Log the outcome and fold a successful result's snapshot into the cache.
    fn process_result(&mut self, action: ActionType, result: ActionResult) -> ActionResult {
        if result.success {
            info!(%action, "action executed");
            if let Some(snapshot) = &result.updated_snapshot {
                self.cache.apply_update(snapshot.clone());
            }
        } else {
            warn!(
                %action,
                error = result.error_message.as_deref().unwrap_or("unspecified"),
                "peer reported action failure"
            );
        }
        result
    }

    /// One monitor iteration: poll for changes, then remove stale files.
    pub fn monitor_tick(&mut self) -> MonitorTick {
        let changed = self.cache.is_changed();
        let summary = self.cache.summary();
        if changed && let Some(summary) = &summary {
            info!(
                session_id = %summary.session_id,
                phase = %summary.phase,
                ante = summary.ante,
                money = summary.money,
                hand_size = summary.hand_size,
                "game state changed"
            );
        }

        let removed = self.cache.transport_mut().cleanup_stale(self.stale_max_age);
        if removed > 0 {
            info!(removed, "cleaned up stale channel files");
        }

        MonitorTick {
            changed,
            summary,
            removed,
        }
    }

    /// Run [`monitor_tick`](Self::monitor_tick) every `period` until
    /// `shutdown` resolves.
    ///
    /// Iterations never fail: transport problems are logged inside the
    /// transport and the next iteration proceeds.
    pub async fn run_monitor<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(period_ms = period.as_millis(), "state monitor started");
        let mut iterations: u64 = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.monitor_tick();
                    iterations = iterations.saturating_add(1);
                }
            }
        }
        info!(iterations, "state monitor stopped");
    }
}
