//! Human-in-the-loop approval gate.
//!
//! [`HumanGate`] is a reusable routing node that suspends a task until an
//! external decision arrives or a configurable timeout elapses. The gate
//! cooperates with two well-known state keys:
//!
//! - [`WAIT_START_KEY`]: RFC3339 timestamp stamped on first entry, used to
//!   measure the wait against [`GateConfig::timeout`].
//! - [`HUMAN_RESPONSE_KEY`]: the decision string, written either by
//!   [`TaskExecutor::submit_human_response`](crate::runtime::TaskExecutor::submit_human_response)
//!   or by the gate itself when the timeout falls back to
//!   [`GateConfig::default_decision`].
//!
//! Wire the gate with [`gate_router`] and a label map covering
//! [`LABEL_APPROVED`], [`LABEL_REJECTED`], and [`LABEL_WAITING`] (the
//! waiting label loops back to the gate node itself):
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskloom::gate::{self, GateConfig, HumanGate, LogNotifier};
//! use taskloom::graph::GraphBuilder;
//! use taskloom::types::NodeKind;
//! # use taskloom::node::{Node, NodeContext, NodeError, NodeUpdate};
//! # use taskloom::state::StateSnapshot;
//! # struct Publish;
//! # #[async_trait::async_trait]
//! # impl Node for Publish {
//! #     async fn run(&self, _s: StateSnapshot, _c: NodeContext) -> Result<NodeUpdate, NodeError> {
//! #         Ok(NodeUpdate::new())
//! #     }
//! # }
//! let gate = HumanGate::new(
//!     Arc::new(LogNotifier),
//!     GateConfig::new(chrono::Duration::hours(4), "rejected", "approve the draft?"),
//! );
//! let workflow = GraphBuilder::new()
//!     .add_routing_node("approval", gate)
//!     .add_node("publish", Publish)
//!     .add_edge(NodeKind::Start, "approval")
//!     .add_conditional_edges(
//!         "approval",
//!         gate::gate_router(),
//!         [
//!             (gate::LABEL_APPROVED, NodeKind::from("publish")),
//!             (gate::LABEL_REJECTED, NodeKind::End),
//!             (gate::LABEL_WAITING, NodeKind::from("approval")),
//!         ],
//!     )
//!     .add_edge("publish", NodeKind::End)
//!     .compile()
//!     .unwrap();
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::graph::RouterFn;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodeUpdate};
use crate::state::StateSnapshot;
use crate::types::TaskStatus;

/// State key holding the RFC3339 timestamp of the gate's first entry.
pub const WAIT_START_KEY: &str = "wait_start_time";
/// State key holding the human (or timeout fallback) decision.
pub const HUMAN_RESPONSE_KEY: &str = "human_response";

/// Router label for an approved decision.
pub const LABEL_APPROVED: &str = "approved";
/// Router label for any non-approved decision.
pub const LABEL_REJECTED: &str = "rejected";
/// Router label while no decision is recorded; maps back to the gate node.
pub const LABEL_WAITING: &str = "waiting";

/// Failure while delivering a notification to the outside world.
#[derive(Debug, Error, Diagnostic)]
#[error("notification delivery failed: {message}")]
#[diagnostic(code(taskloom::gate::notify))]
pub struct NotifyError {
    pub message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Delivery channel for "a task wants your decision" notifications.
///
/// Called exactly once per suspension, on the gate's first entry.
#[async_trait]
pub trait HumanNotifier: Send + Sync {
    async fn notify(&self, task_id: &str, prompt: &str) -> Result<(), NotifyError>;
}

/// Notifier that only logs, for development and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl HumanNotifier for LogNotifier {
    async fn notify(&self, task_id: &str, prompt: &str) -> Result<(), NotifyError> {
        tracing::info!(task = %task_id, prompt = %prompt, "human decision requested");
        Ok(())
    }
}

/// Gate behavior knobs.
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// How long to wait for a decision before falling back.
    pub timeout: chrono::Duration,
    /// Decision recorded when the timeout elapses (typically "rejected").
    pub default_decision: String,
    /// Prompt text passed to the notifier.
    pub prompt: String,
}

impl GateConfig {
    pub fn new(
        timeout: chrono::Duration,
        default_decision: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            timeout,
            default_decision: default_decision.into(),
            prompt: prompt.into(),
        }
    }
}

/// Suspending approval node.
///
/// Behavior per entry:
/// 1. A recorded decision flips the task back to `Running` so the router
///    can dispatch on it.
/// 2. An elapsed timeout records [`GateConfig::default_decision`] as the
///    decision and flips to `Running`.
/// 3. First entry stamps [`WAIT_START_KEY`], notifies once, and suspends
///    with `WaitingHuman`.
/// 4. Re-entry while still waiting suspends again without re-notifying.
pub struct HumanGate {
    notifier: Arc<dyn HumanNotifier>,
    config: GateConfig,
}

impl HumanGate {
    pub fn new(notifier: Arc<dyn HumanNotifier>, config: GateConfig) -> Self {
        Self { notifier, config }
    }

    fn wait_start(snapshot: &StateSnapshot) -> Option<DateTime<Utc>> {
        let raw = snapshot.extra.get(WAIT_START_KEY)?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl std::fmt::Debug for HumanGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HumanGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Node for HumanGate {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeUpdate, NodeError> {
        // A decision already landed (external or previous fallback).
        if snapshot.extra.contains_key(HUMAN_RESPONSE_KEY) {
            ctx.trace("decision present, releasing gate");
            return Ok(NodeUpdate::new().with_status(TaskStatus::Running));
        }

        if let Some(started) = Self::wait_start(&snapshot) {
            let waited = Utc::now().signed_duration_since(started);
            if waited >= self.config.timeout {
                ctx.trace("wait timed out, applying default decision");
                let mut extra = rustc_hash::FxHashMap::default();
                extra.insert(
                    HUMAN_RESPONSE_KEY.to_string(),
                    Value::String(self.config.default_decision.clone()),
                );
                return Ok(NodeUpdate::new()
                    .with_extra(extra)
                    .with_messages(vec![Message::engine(&format!(
                        "no decision within timeout, defaulting to '{}'",
                        self.config.default_decision
                    ))])
                    .with_status(TaskStatus::Running));
            }
            // Still inside the window; suspend again without re-notifying.
            ctx.trace("still waiting for decision");
            return Ok(NodeUpdate::new().with_status(TaskStatus::WaitingHuman));
        }

        // First entry: stamp the wait start and notify exactly once.
        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(
            WAIT_START_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.notifier
            .notify(&ctx.task_id, &self.config.prompt)
            .await
            .map_err(|e| NodeError::Provider {
                provider: "human_notifier",
                message: e.to_string(),
            })?;
        ctx.trace("suspended awaiting human decision");
        Ok(NodeUpdate::new()
            .with_extra(extra)
            .with_messages(vec![Message::engine(&self.config.prompt)])
            .with_status(TaskStatus::WaitingHuman))
    }
}

/// Router for the gate's conditional edge.
///
/// Labels: `"approved"` for an exact `"approved"` decision, `"rejected"`
/// for any other decision, `"waiting"` while none is recorded.
#[must_use]
pub fn gate_router() -> RouterFn {
    Arc::new(|snapshot: &StateSnapshot| {
        match snapshot.extra.get(HUMAN_RESPONSE_KEY).and_then(Value::as_str) {
            Some("approved") => LABEL_APPROVED.to_string(),
            Some(_) => LABEL_REJECTED.to_string(),
            None => LABEL_WAITING.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskState;
    use serde_json::json;

    fn ctx() -> NodeContext {
        NodeContext {
            node_id: "approval".into(),
            task_id: "t-gate".into(),
            sequence: 1,
        }
    }

    #[tokio::test]
    async fn first_entry_stamps_and_suspends() {
        let gate = HumanGate::new(
            Arc::new(LogNotifier),
            GateConfig::new(chrono::Duration::hours(1), "rejected", "ok?"),
        );
        let state = TaskState::new("t-gate");

        let update = gate.run(state.snapshot(), ctx()).await.unwrap();
        assert_eq!(update.status, Some(TaskStatus::WaitingHuman));
        let extra = update.extra.unwrap();
        assert!(extra.contains_key(WAIT_START_KEY));
        assert!(!extra.contains_key(HUMAN_RESPONSE_KEY));
    }

    #[tokio::test]
    async fn decision_releases_gate() {
        let gate = HumanGate::new(
            Arc::new(LogNotifier),
            GateConfig::new(chrono::Duration::hours(1), "rejected", "ok?"),
        );
        let state = TaskState::builder("t-gate")
            .with_extra(HUMAN_RESPONSE_KEY, json!("approved"))
            .build();

        let update = gate.run(state.snapshot(), ctx()).await.unwrap();
        assert_eq!(update.status, Some(TaskStatus::Running));
        assert!(update.extra.is_none());
    }

    #[tokio::test]
    async fn elapsed_timeout_applies_default() {
        let gate = HumanGate::new(
            Arc::new(LogNotifier),
            GateConfig::new(chrono::Duration::zero(), "rejected", "ok?"),
        );
        let state = TaskState::builder("t-gate")
            .with_extra(WAIT_START_KEY, json!(Utc::now().to_rfc3339()))
            .build();

        let update = gate.run(state.snapshot(), ctx()).await.unwrap();
        assert_eq!(update.status, Some(TaskStatus::Running));
        let extra = update.extra.unwrap();
        assert_eq!(extra.get(HUMAN_RESPONSE_KEY), Some(&json!("rejected")));
    }

    #[tokio::test]
    async fn reentry_within_window_suspends_again() {
        let gate = HumanGate::new(
            Arc::new(LogNotifier),
            GateConfig::new(chrono::Duration::hours(1), "rejected", "ok?"),
        );
        let state = TaskState::builder("t-gate")
            .with_extra(WAIT_START_KEY, json!(Utc::now().to_rfc3339()))
            .build();

        let update = gate.run(state.snapshot(), ctx()).await.unwrap();
        assert_eq!(update.status, Some(TaskStatus::WaitingHuman));
        // No second stamp, no fallback decision.
        assert!(update.extra.is_none());
    }

    #[test]
    fn router_labels() {
        let router = gate_router();

        let waiting = TaskState::new("t").snapshot();
        assert_eq!(router(&waiting), LABEL_WAITING);

        let approved = TaskState::builder("t")
            .with_extra(HUMAN_RESPONSE_KEY, json!("approved"))
            .build()
            .snapshot();
        assert_eq!(router(&approved), LABEL_APPROVED);

        let denied = TaskState::builder("t")
            .with_extra(HUMAN_RESPONSE_KEY, json!("nope"))
            .build()
            .snapshot();
        assert_eq!(router(&denied), LABEL_REJECTED);
    }
}
