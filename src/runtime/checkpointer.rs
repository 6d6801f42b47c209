//! Checkpoint types and pluggable persistence.
//!
//! The executor persists a [`Checkpoint`] after every node execution,
//! before routing. Checkpointers enforce strictly increasing per-task
//! sequence numbers, which serializes writers on the same task id: a save
//! with a sequence at or below the stored one is rejected with
//! [`CheckpointerError::StaleSequence`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::state::TaskState;
use crate::types::NodeKind;

/// One persisted point in a task traversal.
///
/// `node` is the last *executed* node (`NodeKind::Start` for a checkpoint
/// taken before the entry node ran). Resuming re-evaluates routing from
/// `node`, which is safe because routers are pure; a routing node's
/// successor override is not re-derivable, so it rides along as
/// `route_hint`.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    /// Task this checkpoint belongs to.
    pub task_id: String,
    /// Last executed node.
    pub node: NodeKind,
    /// Strictly increasing per-task sequence number, starting at 1.
    pub sequence: u64,
    /// Full task state after the node's update was merged.
    pub state: TaskState,
    /// Successor override emitted by a routing node, if any.
    pub route_hint: Option<NodeKind>,
    /// When this checkpoint was created.
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        node: NodeKind,
        sequence: u64,
        state: TaskState,
        route_hint: Option<NodeKind>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            node,
            sequence,
            state,
            route_hint,
            saved_at: Utc::now(),
        }
    }
}

/// Errors surfaced by checkpoint stores.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// A writer attempted to save at or below the stored sequence.
    #[error("stale sequence for task {task_id}: stored {stored}, attempted {attempted}")]
    #[diagnostic(
        code(taskloom::checkpointer::stale_sequence),
        help("Another writer advanced this task; reload the latest checkpoint and retry.")
    )]
    StaleSequence {
        task_id: String,
        stored: u64,
        attempted: u64,
    },

    /// Storage backend failure (connection, IO, SQL).
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(code(taskloom::checkpointer::backend))]
    Backend { message: String },

    /// Serialization failure while encoding or decoding a checkpoint.
    #[error("checkpoint serialization error: {message}")]
    #[diagnostic(code(taskloom::checkpointer::serde))]
    Serde { message: String },

    /// Anything else.
    #[error("checkpointer error: {message}")]
    #[diagnostic(code(taskloom::checkpointer::other))]
    Other { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Pluggable checkpoint persistence.
///
/// Implementations must reject non-increasing sequence numbers per task id;
/// the executor relies on that compare-and-swap for write serialization.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist a checkpoint.
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Load the most recent checkpoint for a task, if any exists.
    async fn load_latest(&self, task_id: &str) -> Result<Option<Checkpoint>>;

    /// List all task ids known to the store.
    async fn list_tasks(&self) -> Result<Vec<String>>;
}

/// Selects the checkpoint backend a [`TaskExecutor`](crate::runtime::TaskExecutor)
/// builds from its [`RuntimeConfig`](crate::runtime::RuntimeConfig).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointerType {
    /// Volatile storage for tests and development.
    InMemory,
    /// Durable SQLite-backed persistence.
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Volatile checkpointer keeping only the latest checkpoint per task.
///
/// Suitable for tests and single-process development runs; nothing
/// survives the process.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    inner: Mutex<FxHashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.get(&checkpoint.task_id) {
            if existing.sequence >= checkpoint.sequence {
                return Err(CheckpointerError::StaleSequence {
                    task_id: checkpoint.task_id.clone(),
                    stored: existing.sequence,
                    attempted: checkpoint.sequence,
                });
            }
        }
        tracing::trace!(
            task = %checkpoint.task_id,
            node = %checkpoint.node,
            sequence = checkpoint.sequence,
            "checkpoint saved (in-memory)"
        );
        inner.insert(checkpoint.task_id.clone(), checkpoint);
        Ok(())
    }

    async fn load_latest(&self, task_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.inner.lock().get(task_id).cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskState;

    #[tokio::test]
    async fn save_and_load_latest() {
        let store = InMemoryCheckpointer::new();
        let cp = Checkpoint::new("t", NodeKind::Custom("a".into()), 1, TaskState::new("t"), None);
        store.save(cp).await.unwrap();

        let loaded = store.load_latest("t").await.unwrap().unwrap();
        assert_eq!(loaded.sequence, 1);
        assert_eq!(loaded.node, NodeKind::Custom("a".into()));
        assert!(store.load_latest("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_stale_sequence() {
        let store = InMemoryCheckpointer::new();
        let state = TaskState::new("t");
        store
            .save(Checkpoint::new("t", NodeKind::Start, 2, state.clone(), None))
            .await
            .unwrap();

        let err = store
            .save(Checkpoint::new("t", NodeKind::Start, 2, state, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckpointerError::StaleSequence {
                stored: 2,
                attempted: 2,
                ..
            }
        ));
    }
}
