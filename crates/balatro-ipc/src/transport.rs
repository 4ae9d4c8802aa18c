//! The transport seam between the bridge logic and the shared directory.
//!
//! [`MessageChannel`](crate::MessageChannel) is the production
//! implementation. Tests for the layers above construct their own fake
//! implementations directly.

use std::time::Duration;

use balatro_types::{ActionRequest, ActionResult, Snapshot};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Poll interval used when a transport does not specify one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exchange of snapshots, commands and results with the peer.
///
/// All operations are soft: failures are logged by the implementation and
/// reported as `None`/`false`, because a poll that finds nothing usable is
/// indistinguishable, for the caller, from a poll that found nothing at all.
pub trait Transport {
    /// Advance and return the local sequence counter.
    fn next_sequence_id(&mut self) -> u64;

    /// The next unseen state snapshot, if the peer has written one.
    fn read_state(&mut self) -> Option<Snapshot>;

    /// Publish a command. Returns `false` if it could not be written.
    fn write_command(&mut self, action: &ActionRequest) -> bool;

    /// The next unseen command result, if the peer has written one.
    fn read_result(&mut self) -> Option<ActionResult>;

    /// Delete channel files older than `max_age`. Returns how many were removed.
    fn cleanup_stale(&mut self, max_age: Duration) -> usize;

    /// Delay between polls in [`wait_for_result`].
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }
}

/// Poll [`Transport::read_result`] until it yields or `timeout` elapses.
///
/// Returns `None` on timeout. The wait is bounded: the last poll happens no
/// later than `timeout` after the first.
pub async fn wait_for_result<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Option<ActionResult> {
    let started = Instant::now();
    let interval = transport.poll_interval();
    let mut polls: u32 = 0;

    loop {
        polls = polls.saturating_add(1);
        if let Some(result) = transport.read_result() {
            debug!(
                polls,
                elapsed_ms = started.elapsed().as_millis(),
                success = result.success,
                "action result received"
            );
            return Some(result);
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            warn!(
                timeout_ms = timeout.as_millis(),
                polls, "timed out waiting for action result"
            );
            return None;
        }

        tokio::time::sleep(interval.min(remaining)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Returns queued results one per poll, `None` once drained.
    #[derive(Default)]
    struct ScriptedTransport {
        results: VecDeque<Option<ActionResult>>,
        reads: u32,
    }

    impl Transport for ScriptedTransport {
        fn next_sequence_id(&mut self) -> u64 {
            0
        }

        fn read_state(&mut self) -> Option<Snapshot> {
            None
        }

        fn write_command(&mut self, _action: &ActionRequest) -> bool {
            true
        }

        fn read_result(&mut self) -> Option<ActionResult> {
            self.reads = self.reads.saturating_add(1);
            self.results.pop_front().flatten()
        }

        fn cleanup_stale(&mut self, _max_age: Duration) -> usize {
            0
        }

        fn poll_interval(&self) -> Duration {
            Duration::from_millis(5)
        }
    }

    #[tokio::test]
    async fn returns_first_result_after_empty_polls() {
        let mut transport = ScriptedTransport {
            results: VecDeque::from([
                None,
                None,
                Some(ActionResult {
                    success: true,
                    error_message: None,
                    updated_snapshot: None,
                }),
            ]),
            reads: 0,
        };

        let result = wait_for_result(&mut transport, Duration::from_secs(1)).await;
        assert!(result.unwrap().success);
        assert_eq!(transport.reads, 3);
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let mut transport = ScriptedTransport::default();
        let started = std::time::Instant::now();

        let result = wait_for_result(&mut transport, Duration::from_millis(50)).await;

        assert!(result.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(transport.reads >= 2);
    }

    #[tokio::test]
    async fn zero_timeout_polls_once() {
        let mut transport = ScriptedTransport::default();
        assert!(wait_for_result(&mut transport, Duration::ZERO).await.is_none());
        assert_eq!(transport.reads, 1);
    }
}
