//! Bounded validate/fix retry loops.
//!
//! A retry loop is a validator node with a conditional edge whose router is
//! built by [`bounded_retry_router`]. The loop cooperates with two
//! well-known state keys:
//!
//! - [`IS_VALID_KEY`]: boolean the validator writes after each check.
//! - [`RETRY_COUNT_KEY`]: number the fix node increments on each attempt.
//!
//! Labels emitted by the router: [`LABEL_DONE`] when validation passed,
//! [`LABEL_FIX`] while attempts remain, [`LABEL_REVIEW`] once the bound is
//! exhausted. The review target conventionally sets
//! [`TaskStatus::NeedsReview`](crate::types::TaskStatus::NeedsReview) so an
//! operator can triage the task.

use std::sync::Arc;

use serde_json::Value;

use crate::graph::RouterFn;
use crate::state::StateSnapshot;

/// State key counting fix attempts.
pub const RETRY_COUNT_KEY: &str = "retry_count";
/// State key holding the last validation verdict.
pub const IS_VALID_KEY: &str = "is_valid";

/// Router label when validation passed.
pub const LABEL_DONE: &str = "done";
/// Router label while fix attempts remain.
pub const LABEL_FIX: &str = "fix";
/// Router label once the retry bound is exhausted.
pub const LABEL_REVIEW: &str = "review";

/// Read the current retry count from state; absent or non-numeric counts
/// as zero.
#[must_use]
pub fn retry_count(snapshot: &StateSnapshot) -> u64 {
    snapshot
        .extra
        .get(RETRY_COUNT_KEY)
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Build a router that bounds a validate/fix loop at `max_retries` fix
/// attempts.
///
/// Routing: `is_valid == true` yields `"done"`; otherwise `"fix"` while
/// `retry_count < max_retries`, and `"review"` after. A missing
/// `is_valid` key counts as invalid, so a validator that forgot to write
/// its verdict still terminates through the bound.
#[must_use]
pub fn bounded_retry_router(max_retries: u32) -> RouterFn {
    Arc::new(move |snapshot: &StateSnapshot| {
        let valid = snapshot
            .extra
            .get(IS_VALID_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if valid {
            return LABEL_DONE.to_string();
        }
        if retry_count(snapshot) < u64::from(max_retries) {
            LABEL_FIX.to_string()
        } else {
            LABEL_REVIEW.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskState;
    use serde_json::json;

    fn snapshot(valid: Option<bool>, count: Option<u64>) -> StateSnapshot {
        let mut builder = TaskState::builder("t");
        if let Some(v) = valid {
            builder = builder.with_extra(IS_VALID_KEY, json!(v));
        }
        if let Some(c) = count {
            builder = builder.with_extra(RETRY_COUNT_KEY, json!(c));
        }
        builder.build().snapshot()
    }

    #[test]
    fn valid_routes_done_regardless_of_count() {
        let router = bounded_retry_router(3);
        assert_eq!(router(&snapshot(Some(true), None)), LABEL_DONE);
        assert_eq!(router(&snapshot(Some(true), Some(99))), LABEL_DONE);
    }

    #[test]
    fn invalid_routes_fix_until_bound() {
        let router = bounded_retry_router(3);
        assert_eq!(router(&snapshot(Some(false), None)), LABEL_FIX);
        assert_eq!(router(&snapshot(Some(false), Some(2))), LABEL_FIX);
        assert_eq!(router(&snapshot(Some(false), Some(3))), LABEL_REVIEW);
        assert_eq!(router(&snapshot(Some(false), Some(4))), LABEL_REVIEW);
    }

    #[test]
    fn missing_verdict_counts_as_invalid() {
        let router = bounded_retry_router(0);
        assert_eq!(router(&snapshot(None, None)), LABEL_REVIEW);
    }

    #[test]
    fn retry_count_defaults_to_zero() {
        assert_eq!(retry_count(&snapshot(None, None)), 0);
        assert_eq!(retry_count(&snapshot(None, Some(7))), 7);
    }
}
