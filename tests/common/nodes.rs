//! Reusable node implementations for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use taskloom::gate::{HumanNotifier, NotifyError};
use taskloom::message::Message;
use taskloom::node::{Node, NodeContext, NodeError, NodeUpdate};
use taskloom::retry::{IS_VALID_KEY, RETRY_COUNT_KEY, retry_count};
use taskloom::state::StateSnapshot;
use taskloom::types::{NodeKind, TaskStatus};

/// Appends one message from a named source; the simplest possible node.
pub struct MessageNode {
    pub name: &'static str,
}

#[async_trait]
impl Node for MessageNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        Ok(NodeUpdate::new().with_messages(vec![Message::new(self.name, "ran")]))
    }
}

/// Appends a message and counts how many times it was executed.
pub struct CountingNode {
    pub name: &'static str,
    pub calls: Arc<AtomicUsize>,
}

impl CountingNode {
    pub fn new(name: &'static str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Node for CountingNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(NodeUpdate::new().with_messages(vec![Message::new(self.name, "ran")]))
    }
}

/// Writes one key into `extra`.
pub struct SetExtraNode {
    pub key: &'static str,
    pub value: Value,
}

#[async_trait]
impl Node for SetExtraNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(self.key.to_string(), self.value.clone());
        Ok(NodeUpdate::new().with_extra(extra))
    }
}

/// Scripted validator: emits `is_valid` verdicts from a fixed sequence,
/// one per call. Calls beyond the script validate successfully.
pub struct ScriptedValidator {
    outcomes: Vec<bool>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedValidator {
    pub fn new(outcomes: Vec<bool>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                outcomes,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Node for ScriptedValidator {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let verdict = self.outcomes.get(call).copied().unwrap_or(true);
        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(IS_VALID_KEY.to_string(), json!(verdict));
        Ok(NodeUpdate::new()
            .with_extra(extra)
            .with_messages(vec![Message::new(
                "validate",
                if verdict { "valid" } else { "invalid" },
            )]))
    }
}

/// Fix node for retry loops: increments the retry counter.
pub struct FixNode;

#[async_trait]
impl Node for FixNode {
    async fn run(&self, snapshot: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        let attempt = retry_count(&snapshot) + 1;
        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(RETRY_COUNT_KEY.to_string(), json!(attempt));
        Ok(NodeUpdate::new()
            .with_extra(extra)
            .with_messages(vec![Message::new("fix", &format!("attempt {attempt}"))]))
    }
}

/// Escalation target for exhausted retry loops.
pub struct ReviewNode;

#[async_trait]
impl Node for ReviewNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        Ok(NodeUpdate::new()
            .with_status(TaskStatus::NeedsReview)
            .with_result(json!({"action": "ESCALATED"}))
            .with_messages(vec![Message::engine("escalated for review")]))
    }
}

/// Terminal branch node: records which action was taken as the result.
pub struct ActionNode {
    pub name: &'static str,
    pub action: &'static str,
}

#[async_trait]
impl Node for ActionNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        Ok(NodeUpdate::new()
            .with_result(json!({"action": self.action}))
            .with_messages(vec![Message::new(self.name, self.action)]))
    }
}

/// Always fails with the given message.
pub struct FailingNode {
    pub message: &'static str,
}

#[async_trait]
impl Node for FailingNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        Err(NodeError::Other(self.message.to_string()))
    }
}

/// Emits a successor override; legal only when registered as a routing node.
pub struct OverrideNode {
    pub target: NodeKind,
}

#[async_trait]
impl Node for OverrideNode {
    async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
        Ok(NodeUpdate::new()
            .with_messages(vec![Message::new("pick", "routing override")])
            .with_next_node(self.target.clone()))
    }
}

/// Notifier that records every delivery, for asserting notify-once behavior.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: parking_lot::Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl HumanNotifier for RecordingNotifier {
    async fn notify(&self, task_id: &str, prompt: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .push((task_id.to_string(), prompt.to_string()));
        Ok(())
    }
}

/// Notifier whose delivery always fails.
pub struct BrokenNotifier;

#[async_trait]
impl HumanNotifier for BrokenNotifier {
    async fn notify(&self, _: &str, _: &str) -> Result<(), NotifyError> {
        Err(NotifyError::new("channel unavailable"))
    }
}
