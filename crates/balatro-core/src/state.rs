//! Cached peer state with change detection.
//!
//! [`StateCache`] wraps a [`Transport`] and keeps the last accepted
//! [`Snapshot`]. Change detection compares a fixed projection of the
//! snapshot (see [`ProjectionKey`]) rather than the whole structure, so a
//! cosmetic reshuffle of the hand does not count as a change.
//!
//! Cross-snapshot invariants (session identity, ante monotonicity) are
//! checked on every update and logged. They are advisory: the update is
//! applied regardless, and callers that want to treat a violation as fatal
//! can inspect [`StateCache::last_violations`].

use std::time::Duration;

use balatro_ipc::Transport;
use balatro_types::{Phase, Snapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The fields whose change counts as a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionKey {
    session_id: String,
    phase: Phase,
    ante: i64,
    money: i64,
    hands_remaining: i64,
    discards_remaining: i64,
    hand_size: usize,
    joker_count: usize,
    reorder_available: bool,
}

impl ProjectionKey {
    /// Project `snapshot` onto the change-detection fields.
    pub fn of(snapshot: &Snapshot) -> Self {
        Self {
            session_id: snapshot.session_id.clone(),
            phase: snapshot.current_phase,
            ante: snapshot.ante,
            money: snapshot.money,
            hands_remaining: snapshot.hands_remaining,
            discards_remaining: snapshot.discards_remaining,
            hand_size: snapshot.hand_cards.len(),
            joker_count: snapshot.jokers.len(),
            reorder_available: snapshot.post_hand_joker_reorder_available,
        }
    }
}

/// A broken cross-snapshot invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum TransitionViolation {
    /// The session identifier changed mid-stream.
    #[error("session changed from {from:?} to {to:?}")]
    SessionChanged {
        /// Session of the previous snapshot.
        from: String,
        /// Session of the new snapshot.
        to: String,
    },

    /// The ante went down.
    #[error("ante decreased from {from} to {to}")]
    AnteDecreased {
        /// Ante of the previous snapshot.
        from: i64,
        /// Ante of the new snapshot.
        to: i64,
    },
}

/// Check the invariants that must hold between consecutive snapshots.
///
/// Phase transitions are not constrained.
pub fn check_transition(old: &Snapshot, new: &Snapshot) -> Vec<TransitionViolation> {
    let mut violations = Vec::new();
    if old.session_id != new.session_id {
        violations.push(TransitionViolation::SessionChanged {
            from: old.session_id.clone(),
            to: new.session_id.clone(),
        });
    }
    if new.ante < old.ante {
        violations.push(TransitionViolation::AnteDecreased {
            from: old.ante,
            to: new.ante,
        });
    }
    violations
}

/// Serialisable digest of the cached state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    /// Session identifier.
    pub session_id: String,
    /// Current phase.
    pub phase: Phase,
    /// Current ante.
    pub ante: i64,
    /// Money held.
    pub money: i64,
    /// Hands left this round.
    pub hands_remaining: i64,
    /// Discards left this round.
    pub discards_remaining: i64,
    /// Cards in hand.
    pub hand_size: usize,
    /// Jokers held.
    pub joker_count: usize,
    /// Consumables held.
    pub consumable_count: usize,
    /// Whether the joker reorder window is open.
    pub reorder_available: bool,
    /// When the projection last changed.
    pub last_update: Option<DateTime<Utc>>,
}

/// Last accepted snapshot plus a one-shot change flag.
#[derive(Debug)]
pub struct StateCache<T: Transport> {
    transport: T,
    current: Option<Snapshot>,
    last_update: Option<DateTime<Utc>>,
    changed: bool,
    last_violations: Vec<TransitionViolation>,
}

impl<T: Transport> StateCache<T> {
    /// An empty cache reading from `transport`.
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            current: None,
            last_update: None,
            changed: false,
            last_violations: Vec::new(),
        }
    }

    /// The cached snapshot, without polling.
    pub const fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    /// Pull any pending snapshot from the transport, then return the cache.
    ///
    /// The returned snapshot may be stale if the peer has written nothing new.
    pub fn get_current(&mut self) -> Option<&Snapshot> {
        if let Some(snapshot) = self.transport.read_state() {
            self.apply_update(snapshot);
        }
        self.current.as_ref()
    }

    /// Replace the cached snapshot with `snapshot`.
    ///
    /// Returns `true` if the projection differs from the previous one, in
    /// which case the update time is stamped and the change flag set.
    pub fn apply_update(&mut self, snapshot: Snapshot) -> bool {
        let changed = match &self.current {
            None => {
                self.last_violations.clear();
                true
            }
            Some(old) => {
                self.last_violations = check_transition(old, &snapshot);
                for violation in &self.last_violations {
                    warn!(%violation, "state transition violates invariant");
                }
                ProjectionKey::of(old) != ProjectionKey::of(&snapshot)
            }
        };

        if changed {
            info!(
                session_id = %snapshot.session_id,
                phase = %snapshot.current_phase,
                ante = snapshot.ante,
                money = snapshot.money,
                "state changed"
            );
            self.last_update = Some(Utc::now());
            self.changed = true;
        } else {
            debug!("state update with unchanged projection");
        }

        self.current = Some(snapshot);
        changed
    }

    /// Whether the state changed since the last call. Polls first.
    pub fn is_changed(&mut self) -> bool {
        self.get_current();
        std::mem::take(&mut self.changed)
    }

    /// Poll [`is_changed`](Self::is_changed) every `interval` until it
    /// reports a change or `timeout` elapses.
    pub async fn wait_for_change(&mut self, timeout: Duration, interval: Duration) -> bool {
        let started = Instant::now();
        loop {
            if self.is_changed() {
                return true;
            }
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return false;
            }
            tokio::time::sleep(interval.min(remaining)).await;
        }
    }

    /// Digest of the cached snapshot, if there is one.
    pub fn summary(&self) -> Option<StateSummary> {
        self.current.as_ref().map(|s| StateSummary {
            session_id: s.session_id.clone(),
            phase: s.current_phase,
            ante: s.ante,
            money: s.money,
            hands_remaining: s.hands_remaining,
            discards_remaining: s.discards_remaining,
            hand_size: s.hand_cards.len(),
            joker_count: s.jokers.len(),
            consumable_count: s.consumables.len(),
            reorder_available: s.post_hand_joker_reorder_available,
            last_update: self.last_update,
        })
    }

    /// When the projection last changed.
    pub const fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Invariant violations found by the most recent update.
    pub fn last_violations(&self) -> &[TransitionViolation] {
        &self.last_violations
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
