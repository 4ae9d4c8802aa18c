//! Exchanges with a simulated peer writing into a real temporary directory.

#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use balatro_ipc::{ChannelConfig, ChannelError, ChannelFile, MessageChannel, Transport};
use balatro_types::{ActionRequest, MessageKind, Phase};
use serde_json::{Value, json};

// =============================================================================
// Helpers
// =============================================================================

fn open_channel() -> (tempfile::TempDir, MessageChannel) {
    let dir = tempfile::tempdir().unwrap();
    let config = ChannelConfig::with_base_path(dir.path().join("shared").to_string_lossy());
    let channel = MessageChannel::open(&config).unwrap();
    (dir, channel)
}

fn snapshot_json(money: i64) -> Value {
    json!({
        "session_id": "run-1",
        "current_phase": "shop",
        "ante": 2,
        "money": money,
        "hands_remaining": 4,
        "discards_remaining": 3,
        "hand_cards": [],
        "jokers": [],
        "consumables": [],
        "available_actions": ["buy_item", "reroll_shop"]
    })
}

/// Write an envelope the way the peer does.
fn peer_write(path: &Path, sequence_id: u64, kind: &str, data: &Value) {
    let envelope = json!({
        "timestamp": "2026-01-01T00:00:00Z",
        "sequence_id": sequence_id,
        "message_type": kind,
        "data": data,
    });
    std::fs::write(path, serde_json::to_string(&envelope).unwrap()).unwrap();
}

fn set_age(path: &Path, age: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now().checked_sub(age).unwrap())
        .unwrap();
}

// =============================================================================
// State
// =============================================================================

#[test]
fn state_is_delivered_once_per_sequence_id() {
    let (_dir, mut channel) = open_channel();
    let state = channel.path_of(ChannelFile::State).to_path_buf();

    assert!(channel.read_state().is_none());

    peer_write(&state, 5, "state", &snapshot_json(10));
    let snapshot = channel.read_state().unwrap();
    assert_eq!(snapshot.current_phase, Phase::Shop);
    assert_eq!(snapshot.money, 10);

    assert!(channel.read_state().is_none());

    // Rewriting with the same id is still a duplicate.
    peer_write(&state, 5, "state", &snapshot_json(99));
    assert!(channel.read_state().is_none());

    peer_write(&state, 6, "state", &snapshot_json(12));
    assert_eq!(channel.read_state().unwrap().money, 12);
    assert_eq!(channel.last_accepted(ChannelFile::State), Some(6));
}

#[test]
fn legacy_kind_name_is_accepted() {
    let (_dir, mut channel) = open_channel();
    let state = channel.path_of(ChannelFile::State).to_path_buf();

    peer_write(&state, 1, "game_state", &snapshot_json(4));
    assert_eq!(channel.read_state().unwrap().money, 4);
}

#[test]
fn wrong_kind_is_rejected_without_consuming_sequence() {
    let (_dir, mut channel) = open_channel();
    let state = channel.path_of(ChannelFile::State).to_path_buf();

    peer_write(&state, 3, "result", &json!({ "success": true }));
    let err = channel.try_read_state().unwrap_err();
    assert!(matches!(
        err,
        ChannelError::UnexpectedKind {
            expected: MessageKind::State,
            found: MessageKind::Result,
            ..
        }
    ));
    assert!(channel.read_state().is_none());
    assert_eq!(channel.last_accepted(ChannelFile::State), None);

    peer_write(&state, 3, "state", &snapshot_json(1));
    assert!(channel.read_state().is_some());
}

#[test]
fn malformed_state_yields_nothing() {
    let (_dir, mut channel) = open_channel();
    let state = channel.path_of(ChannelFile::State).to_path_buf();

    std::fs::write(&state, "{ not json").unwrap();
    assert!(matches!(
        channel.try_read_state(),
        Err(ChannelError::Malformed { .. })
    ));
    assert!(channel.read_state().is_none());

    // Valid envelope, invalid payload.
    peer_write(&state, 1, "state", &json!({ "money": "lots" }));
    assert!(channel.read_state().is_none());
    assert_eq!(channel.last_accepted(ChannelFile::State), None);
}

#[test]
fn naive_timestamp_and_negative_counters_are_delivered() {
    let (_dir, mut channel) = open_channel();
    let state = channel.path_of(ChannelFile::State).to_path_buf();

    let mut data = snapshot_json(3);
    data["hands_remaining"] = json!(-1);
    let envelope = json!({
        "timestamp": "2026-01-01T00:00:00",
        "sequence_id": 1,
        "message_type": "state",
        "data": data,
    });
    std::fs::write(&state, serde_json::to_string(&envelope).unwrap()).unwrap();

    let snapshot = channel.try_read_state().unwrap().unwrap();
    assert_eq!(snapshot.hands_remaining, -1);
    assert_eq!(channel.last_accepted(ChannelFile::State), Some(1));
}

// =============================================================================
// Commands and results
// =============================================================================

#[test]
fn result_is_consumed_on_read() {
    let (_dir, mut channel) = open_channel();
    let result = channel.path_of(ChannelFile::Result).to_path_buf();

    assert!(channel.write_command(&ActionRequest::GoToShop));
    peer_write(&result, 1, "result", &json!({ "success": true }));

    let read = channel.read_result().unwrap();
    assert!(read.success);
    assert!(!result.exists());
    assert!(channel.read_result().is_none());
}

#[test]
fn result_carries_snapshot_under_either_name() {
    let (_dir, mut channel) = open_channel();
    let result = channel.path_of(ChannelFile::Result).to_path_buf();

    peer_write(
        &result,
        1,
        "action_result",
        &json!({ "success": true, "new_state": snapshot_json(7) }),
    );
    let read = channel.read_result().unwrap();
    assert_eq!(read.updated_snapshot.unwrap().money, 7);
}

#[test]
fn result_older_than_last_command_is_discarded() {
    let (_dir, mut channel) = open_channel();
    let result = channel.path_of(ChannelFile::Result).to_path_buf();

    assert!(channel.write_command(&ActionRequest::RerollShop));
    assert!(channel.write_command(&ActionRequest::RerollShop));

    peer_write(&result, 1, "result", &json!({ "success": true }));
    assert!(channel.read_result().is_none());
    assert!(!result.exists());

    peer_write(
        &result,
        2,
        "result",
        &json!({ "success": false, "error_message": "not enough money" }),
    );
    let read = channel.read_result().unwrap();
    assert!(!read.success);
    assert_eq!(read.error_message.as_deref(), Some("not enough money"));
}

#[tokio::test]
async fn wait_for_result_times_out_within_bounds() {
    let (_dir, mut channel) = open_channel();

    let started = Instant::now();
    let result = channel.wait_for_result(Duration::from_millis(100)).await;
    let elapsed = started.elapsed();

    assert!(result.is_none());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(400));
}

#[tokio::test]
async fn wait_for_result_sees_late_result() {
    let (_dir, mut channel) = open_channel();
    let result = channel.path_of(ChannelFile::Result).to_path_buf();
    assert!(channel.write_command(&ActionRequest::SortHandByRank));

    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        peer_write(&result, 1, "result", &json!({ "success": true }));
    });

    let read = channel.wait_for_result(Duration::from_secs(2)).await;
    writer.await.unwrap();
    assert!(read.unwrap().success);
}

// =============================================================================
// Cleanup and path checks
// =============================================================================

#[test]
fn cleanup_removes_only_old_files() {
    let (_dir, mut channel) = open_channel();
    let state = channel.path_of(ChannelFile::State).to_path_buf();
    let result = channel.path_of(ChannelFile::Result).to_path_buf();
    let temp = channel.temp_path().to_path_buf();

    peer_write(&state, 1, "state", &snapshot_json(0));
    peer_write(&result, 1, "result", &json!({ "success": true }));
    std::fs::write(&temp, "partial").unwrap();
    set_age(&state, Duration::from_secs(600));
    set_age(&temp, Duration::from_secs(600));

    assert_eq!(channel.cleanup_stale(Duration::from_secs(300)), 2);
    assert!(!state.exists());
    assert!(!temp.exists());
    assert!(result.exists());

    assert_eq!(channel.cleanup_stale(Duration::from_secs(300)), 0);
}

#[test]
fn traversal_in_base_path_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let raw = format!("{}/../escape", dir.path().display());
    let err = MessageChannel::open(&ChannelConfig::with_base_path(raw)).unwrap_err();
    assert!(err.is_configuration());
}

#[cfg(unix)]
#[test]
fn symlinked_state_file_is_refused() {
    let (dir, mut channel) = open_channel();
    let outside = dir.path().join("outside.json");
    peer_write(&outside, 1, "state", &snapshot_json(0));
    std::os::unix::fs::symlink(&outside, channel.path_of(ChannelFile::State)).unwrap();

    assert!(channel.try_read_state().unwrap_err().is_configuration());
    assert!(channel.read_state().is_none());
}
