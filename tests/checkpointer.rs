//! Checkpoint store behavior and persisted-shape round-trips.

mod common;

use serde_json::json;

use taskloom::runtime::{
    Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer, PersistedCheckpoint,
};
use taskloom::state::TaskState;
use taskloom::types::{NodeKind, TaskStatus};

#[tokio::test]
async fn latest_checkpoint_wins() {
    let store = InMemoryCheckpointer::new();
    let mut state = TaskState::new("t");
    state.status = TaskStatus::Running;

    store
        .save(Checkpoint::new("t", NodeKind::from("a"), 1, state.clone(), None))
        .await
        .unwrap();
    state.messages.push(taskloom::message::Message::new("b", "ran"));
    store
        .save(Checkpoint::new("t", NodeKind::from("b"), 2, state, None))
        .await
        .unwrap();

    let latest = store.load_latest("t").await.unwrap().unwrap();
    assert_eq!(latest.sequence, 2);
    assert_eq!(latest.node, NodeKind::from("b"));
    assert_eq!(latest.state.messages.len(), 1);
}

#[tokio::test]
async fn sequence_regression_is_rejected() {
    let store = InMemoryCheckpointer::new();
    let state = TaskState::new("t");
    store
        .save(Checkpoint::new("t", NodeKind::from("a"), 5, state.clone(), None))
        .await
        .unwrap();

    // Equal and lower sequences are both stale.
    for attempted in [5, 3] {
        let err = store
            .save(Checkpoint::new("t", NodeKind::from("a"), attempted, state.clone(), None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckpointerError::StaleSequence { stored: 5, .. }
        ));
    }

    // The next sequence is accepted.
    store
        .save(Checkpoint::new("t", NodeKind::from("b"), 6, state, None))
        .await
        .unwrap();
}

#[tokio::test]
async fn sequences_are_tracked_per_task() {
    let store = InMemoryCheckpointer::new();
    store
        .save(Checkpoint::new("t1", NodeKind::from("a"), 3, TaskState::new("t1"), None))
        .await
        .unwrap();
    // A lower sequence on a different task is not stale.
    store
        .save(Checkpoint::new("t2", NodeKind::from("a"), 1, TaskState::new("t2"), None))
        .await
        .unwrap();

    let mut tasks = store.list_tasks().await.unwrap();
    tasks.sort();
    assert_eq!(tasks, vec!["t1", "t2"]);
}

#[test]
fn persisted_checkpoint_keeps_route_hint_and_status() {
    let mut state = TaskState::builder("t-persist")
        .with_message("pick", "routing override")
        .with_extra("retry_count", json!(2))
        .build();
    state.status = TaskStatus::WaitingHuman;

    let cp = Checkpoint::new(
        "t-persist",
        NodeKind::from("pick"),
        4,
        state,
        Some(NodeKind::from("publish")),
    );

    let json = PersistedCheckpoint::from(&cp).to_json_string().unwrap();
    let back = Checkpoint::try_from(PersistedCheckpoint::from_json_str(&json).unwrap()).unwrap();

    assert_eq!(back.route_hint, Some(NodeKind::from("publish")));
    assert_eq!(back.state.status, TaskStatus::WaitingHuman);
    assert_eq!(back.state.extra.get("retry_count"), Some(&json!(2)));
    assert_eq!(back.node, NodeKind::from("pick"));
    assert_eq!(back.sequence, 4);
}

#[test]
fn persisted_checkpoint_without_optionals_decodes() {
    // Older rows may lack route_hint/error/result entirely.
    let raw = json!({
        "task_id": "t-min",
        "node": "Custom:a",
        "sequence": 1,
        "state": {
            "task_id": "t-min",
            "status": "RUNNING",
            "started_at": "2026-08-23T10:00:00Z"
        },
        "saved_at": "2026-08-23T10:00:01Z"
    });
    let persisted = PersistedCheckpoint::from_json_str(&raw.to_string()).unwrap();
    let cp = Checkpoint::try_from(persisted).unwrap();
    assert_eq!(cp.node, NodeKind::from("a"));
    assert!(cp.route_hint.is_none());
    assert!(cp.state.messages.is_empty());
}
