//! Node execution framework for the Taskloom workflow engine.
//!
//! This module provides the core abstractions for executable workflow nodes:
//! the [`Node`] trait, the execution context, partial state updates, and
//! node-level error handling.

// Standard library and external crates
use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

// Internal crate modules
use crate::message::Message;
use crate::state::{ErrorInfo, StateSnapshot};
use crate::types::{NodeKind, TaskStatus};

// ============================================================================
// Core Trait
// ============================================================================

/// Core trait defining executable workflow nodes.
///
/// A `Node` is a single unit of computation within a workflow. Nodes receive
/// an immutable state snapshot and an execution context, perform their work,
/// and return a partial update that the executor merges into the canonical
/// state.
///
/// # Design Principles
///
/// - **Stateless**: nodes should be stateless and deterministic
/// - **Focused**: each node has a single, well-defined responsibility
/// - **Append-only**: nodes add messages; they never rewrite the trail
///
/// # Error Handling
///
/// Returning `Err(NodeError)` fails the task: the executor records an
/// [`ErrorInfo`], marks the state `Failed`, and persists a final checkpoint.
/// Recoverable conditions should instead be written into `extra` (e.g. a
/// validation verdict) and resolved by routing.
///
/// # Examples
///
/// ```rust,no_run
/// use taskloom::node::{Node, NodeContext, NodeError, NodeUpdate};
/// use taskloom::message::Message;
/// use taskloom::state::StateSnapshot;
/// use async_trait::async_trait;
/// use serde_json::json;
///
/// struct ValidationNode;
///
/// #[async_trait]
/// impl Node for ValidationNode {
///     async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodeUpdate, NodeError> {
///         let payload = snapshot
///             .extra
///             .get("payload")
///             .ok_or(NodeError::MissingInput { what: "payload" })?;
///
///         let valid = payload.get("text").is_some();
///         let mut extra = rustc_hash::FxHashMap::default();
///         extra.insert("is_valid".to_string(), json!(valid));
///         Ok(NodeUpdate::new()
///             .with_messages(vec![Message::new("validate", "checked payload")])
///             .with_extra(extra))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute this node with the given state snapshot and context.
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeUpdate, NodeError>;
}

// ============================================================================
// Execution Context
// ============================================================================

/// Execution context passed to nodes during workflow execution.
///
/// Carries the node's identity and position in the traversal so nodes can
/// produce traceable diagnostics without holding engine internals.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Name of the node being executed.
    pub node_id: String,
    /// Task this execution belongs to.
    pub task_id: String,
    /// Checkpoint sequence number this execution will be persisted under.
    pub sequence: u64,
}

impl NodeContext {
    /// Emit a node-scoped trace event enriched with this context's metadata.
    pub fn trace(&self, message: &str) {
        tracing::debug!(
            node = %self.node_id,
            task = %self.task_id,
            sequence = self.sequence,
            "{message}"
        );
    }
}

// ============================================================================
// State Updates
// ============================================================================

/// Partial state update returned by node execution.
///
/// Represents the changes a node wants to make to the task state. All fields
/// are optional, so nodes only describe what they touched; the executor owns
/// the merge (see [`TaskState::apply_update`](crate::state::TaskState::apply_update)).
///
/// `next_node` is a successor override and is only legal from nodes
/// registered through
/// [`GraphBuilder::add_routing_node`](crate::graph::GraphBuilder::add_routing_node);
/// the executor fails the task if any other node sets it.
///
/// # Examples
///
/// ```rust
/// use taskloom::node::NodeUpdate;
/// use taskloom::message::Message;
/// use taskloom::types::TaskStatus;
/// use serde_json::json;
///
/// // Message-only update
/// let update = NodeUpdate::new().with_messages(vec![Message::new("fix", "patched draft")]);
///
/// // Terminal update with a result
/// let update = NodeUpdate::new()
///     .with_status(TaskStatus::NeedsReview)
///     .with_result(json!({"action": "ESCALATED"}));
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodeUpdate {
    /// Messages to append to the task's audit trail.
    pub messages: Option<Vec<Message>>,
    /// Key-value data to merge into the task's extra storage.
    pub extra: Option<FxHashMap<String, Value>>,
    /// New lifecycle status, if the node transitions the task.
    pub status: Option<TaskStatus>,
    /// Failure record to attach.
    pub error: Option<ErrorInfo>,
    /// Final output to set.
    pub result: Option<Value>,
    /// Successor override; routing nodes only.
    pub next_node: Option<NodeKind>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self {
            ..Default::default()
        }
    }

    /// Create a `NodeUpdate` with one or more messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Create a `NodeUpdate` with extra data.
    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Create a `NodeUpdate` that transitions the task status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Create a `NodeUpdate` carrying a failure record.
    #[must_use]
    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    /// Create a `NodeUpdate` that sets the task result.
    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Create a `NodeUpdate` that overrides the successor node.
    #[must_use]
    pub fn with_next_node(mut self, next: NodeKind) -> Self {
        self.next_node = Some(next);
        self
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during node execution.
///
/// `NodeError` represents fatal errors that fail the task. Recoverable
/// conditions belong in `extra` and are handled by routing instead.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(taskloom::node::missing_input),
        help("Check that the previous node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(taskloom::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(taskloom::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed in a way the workflow cannot recover from.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(taskloom::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// Catch-all for application-specific failures.
    #[error("{0}")]
    #[diagnostic(code(taskloom::node::other))]
    Other(String),
}
