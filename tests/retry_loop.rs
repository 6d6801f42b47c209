//! Bounded validate/fix retry loops, end to end.

mod common;

use std::sync::atomic::Ordering;

use serde_json::json;

use taskloom::retry::RETRY_COUNT_KEY;
use taskloom::state::TaskState;
use taskloom::types::TaskStatus;

use common::asserts::{assert_status, message_sources};
use common::fixtures::{memory_executor, retry_workflow};

#[tokio::test]
async fn first_try_valid_completes_without_fixes() {
    let (workflow, validate_calls) = retry_workflow(vec![true], 3);
    let (executor, _) = memory_executor(workflow);

    let finished = executor.invoke(TaskState::new("t-clean")).await.unwrap();

    assert_status(&finished, TaskStatus::Completed);
    assert_eq!(validate_calls.load(Ordering::SeqCst), 1);
    assert!(finished.extra.get(RETRY_COUNT_KEY).is_none());
}

#[tokio::test]
async fn recovers_after_two_fix_attempts() {
    let (workflow, validate_calls) = retry_workflow(vec![false, false, true], 3);
    let (executor, _) = memory_executor(workflow);

    let finished = executor.invoke(TaskState::new("t-recover")).await.unwrap();

    assert_status(&finished, TaskStatus::Completed);
    assert_eq!(validate_calls.load(Ordering::SeqCst), 3);
    assert_eq!(finished.extra.get(RETRY_COUNT_KEY), Some(&json!(2)));
    assert_eq!(
        message_sources(&finished),
        vec!["validate", "fix", "validate", "fix", "validate"]
    );
}

#[tokio::test]
async fn exhausted_bound_escalates_to_review() {
    // Validation never passes: 1 initial check + 3 re-checks, 3 fixes, then
    // escalation instead of a fourth fix.
    let (workflow, validate_calls) = retry_workflow(vec![false, false, false, false], 3);
    let (executor, store) = memory_executor(workflow);

    let finished = executor.invoke(TaskState::new("t-exhaust")).await.unwrap();

    assert_status(&finished, TaskStatus::NeedsReview);
    assert_eq!(validate_calls.load(Ordering::SeqCst), 4);
    assert_eq!(finished.extra.get(RETRY_COUNT_KEY), Some(&json!(3)));
    assert_eq!(finished.result, Some(json!({"action": "ESCALATED"})));

    // NEEDS_REVIEW is terminal: the stored checkpoint keeps it and a
    // follow-up invoke does not restart the loop.
    use taskloom::runtime::Checkpointer;
    let cp = store.load_latest("t-exhaust").await.unwrap().unwrap();
    assert_eq!(cp.state.status, TaskStatus::NeedsReview);

    let again = executor.invoke(TaskState::new("t-exhaust")).await.unwrap();
    assert_status(&again, TaskStatus::NeedsReview);
    assert_eq!(validate_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn zero_retries_escalates_immediately() {
    let (workflow, validate_calls) = retry_workflow(vec![false], 0);
    let (executor, _) = memory_executor(workflow);

    let finished = executor.invoke(TaskState::new("t-zero")).await.unwrap();

    assert_status(&finished, TaskStatus::NeedsReview);
    assert_eq!(validate_calls.load(Ordering::SeqCst), 1);
    assert!(finished.extra.get(RETRY_COUNT_KEY).is_none());
}
