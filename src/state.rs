//! Task state management for the Taskloom workflow engine.
//!
//! This module provides the canonical state container that flows through a
//! traversal, along with the immutable snapshot handed to nodes and routers.
//!
//! # Core Types
//!
//! - [`TaskState`]: The full mutable state owned by the executor
//! - [`StateSnapshot`]: Immutable view passed to nodes and routers
//! - [`ErrorInfo`]: Structured failure record attached on node errors
//!
//! The executor owns all mutation: nodes return
//! [`NodeUpdate`](crate::node::NodeUpdate) partials and the engine merges
//! them via [`TaskState::apply_update`]. That makes the append-only message
//! trail and the immutable task id structural guarantees rather than
//! conventions.
//!
//! # Examples
//!
//! ```rust
//! use taskloom::state::TaskState;
//! use serde_json::json;
//!
//! let state = TaskState::builder("task-42")
//!     .with_extra("payload", json!({"text": "hello"}))
//!     .build();
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.task_id, "task-42");
//! assert_eq!(snapshot.extra.get("payload"), Some(&json!({"text": "hello"})));
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;
use crate::node::NodeUpdate;
use crate::types::TaskStatus;

/// Structured record of a failure, attached to the state when a node errors
/// or the engine aborts a traversal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Name of the node (or `engine`) where the failure occurred.
    pub node: String,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// When the failure was recorded.
    pub when: DateTime<Utc>,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
            when: Utc::now(),
        }
    }
}

/// The full state of one task traversal.
///
/// The typed base fields cover what every workflow needs; `extra` carries
/// workflow-specific values (retry counters, gate bookkeeping, validation
/// outputs) without losing the typed core.
///
/// `task_id` and `started_at` are set at construction and never touched by
/// update merges. `messages` only ever grows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    /// Stable identifier of the task; also the checkpoint key.
    pub task_id: String,
    /// Lifecycle position, see [`TaskStatus`].
    pub status: TaskStatus,
    /// Failure record, populated when the task fails.
    pub error: Option<ErrorInfo>,
    /// Append-only audit trail of the traversal.
    pub messages: Vec<Message>,
    /// Final output, typically set by a terminal node.
    pub result: Option<Value>,
    /// Workflow-specific key-value data.
    pub extra: FxHashMap<String, Value>,
    /// When the task was created; used for wall-clock budget checks.
    pub started_at: DateTime<Utc>,
}

/// Immutable view of a [`TaskState`] at a point in time.
///
/// Snapshots are handed to nodes and routers so they can read freely without
/// being able to mutate the canonical state. They are plain clones: mutating
/// the original afterwards does not affect an existing snapshot.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    /// Task identifier at snapshot time.
    pub task_id: String,
    /// Status at snapshot time.
    pub status: TaskStatus,
    /// Failure record at snapshot time.
    pub error: Option<ErrorInfo>,
    /// Audit trail at snapshot time.
    pub messages: Vec<Message>,
    /// Result at snapshot time.
    pub result: Option<Value>,
    /// Workflow-specific data at snapshot time.
    pub extra: FxHashMap<String, Value>,
    /// Task creation time.
    pub started_at: DateTime<Utc>,
}

impl TaskState {
    /// Creates a fresh `Pending` state for the given task id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskloom::state::TaskState;
    /// use taskloom::types::TaskStatus;
    ///
    /// let state = TaskState::new("task-1");
    /// assert_eq!(state.status, TaskStatus::Pending);
    /// assert!(state.messages.is_empty());
    /// ```
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            error: None,
            messages: Vec::new(),
            result: None,
            extra: FxHashMap::default(),
            started_at: Utc::now(),
        }
    }

    /// Creates a builder for constructing a state with initial data.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use taskloom::state::TaskState;
    /// use serde_json::json;
    ///
    /// let state = TaskState::builder("task-1")
    ///     .with_message("engine", "created from request 7")
    ///     .with_extra("priority", json!("high"))
    ///     .build();
    ///
    /// assert_eq!(state.messages.len(), 1);
    /// assert_eq!(state.extra.len(), 1);
    /// ```
    pub fn builder(task_id: impl Into<String>) -> TaskStateBuilder {
        TaskStateBuilder::new(task_id)
    }

    /// Creates an immutable snapshot of the current state.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            task_id: self.task_id.clone(),
            status: self.status,
            error: self.error.clone(),
            messages: self.messages.clone(),
            result: self.result.clone(),
            extra: self.extra.clone(),
            started_at: self.started_at,
        }
    }

    /// Merges a node's partial update into this state.
    ///
    /// Messages are appended in the order the node produced them. Extra
    /// entries are inserted in sorted key order so that merged states are
    /// byte-deterministic regardless of map iteration order. `status`,
    /// `error`, and `result` replace the current value only when the update
    /// carries one.
    ///
    /// The update's `next_node` field is a routing concern and is not
    /// applied here; the executor consumes it separately.
    pub fn apply_update(&mut self, update: NodeUpdate) {
        if let Some(messages) = update.messages {
            self.messages.extend(messages);
        }
        if let Some(extra) = update.extra {
            let mut pairs: Vec<(String, Value)> = extra.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            for (k, v) in pairs {
                self.extra.insert(k, v);
            }
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
    }
}

/// Builder for constructing [`TaskState`] with a fluent API.
///
/// Useful when task adapters seed a traversal with request parameters, or
/// when tests need a state in a specific shape.
#[derive(Debug)]
pub struct TaskStateBuilder {
    task_id: String,
    messages: Vec<Message>,
    extra: FxHashMap<String, Value>,
}

impl TaskStateBuilder {
    fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            messages: Vec::new(),
            extra: FxHashMap::default(),
        }
    }

    /// Adds an audit-trail message.
    #[must_use]
    pub fn with_message(mut self, source: &str, content: &str) -> Self {
        self.messages.push(Message::new(source, content));
        self
    }

    /// Adds a workflow-specific entry to `extra`.
    #[must_use]
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Builds the final `Pending` state.
    pub fn build(self) -> TaskState {
        TaskState {
            task_id: self.task_id,
            status: TaskStatus::Pending,
            error: None,
            messages: self.messages,
            result: None,
            extra: self.extra,
            started_at: Utc::now(),
        }
    }
}
