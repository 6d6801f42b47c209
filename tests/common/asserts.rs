//! Assertion helpers for integration tests.

use taskloom::state::TaskState;
use taskloom::types::TaskStatus;

/// Assert the state ended in `expected` and, on mismatch, show the full
/// message trail for diagnosis.
pub fn assert_status(state: &TaskState, expected: TaskStatus) {
    assert_eq!(
        state.status, expected,
        "unexpected status for {} (messages: {:?})",
        state.task_id, state.messages
    );
}

/// Sources of the message trail, in order.
pub fn message_sources(state: &TaskState) -> Vec<&str> {
    state.messages.iter().map(|m| m.source.as_str()).collect()
}
