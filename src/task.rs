//! Domain-facing task wrappers.
//!
//! A [`TaskAdapter`] is the thin translation layer between a domain's
//! request/response types and the engine's [`TaskState`]: it seeds the
//! initial state from typed parameters and parses a typed output back out
//! of whatever state the traversal ended in (including `Failed` and
//! `NeedsReview` states, so callers always get a structured answer).
//!
//! [`TaskWrapper`] binds an adapter to a workflow and executor, exposing
//! `run` and `resume` in domain terms.

use std::sync::Arc;

use tracing::instrument;

use crate::runtime::{ExecutorError, RuntimeConfig, TaskExecutor};
use crate::state::TaskState;
use crate::utils::id_generator::IdGenerator;
use crate::types::TaskStatus;
use crate::workflow::Workflow;

/// Translation between a domain's types and engine state.
///
/// `parse_result` is infallible by contract: it must produce an output for
/// any state the engine can return, terminal or suspended. Encode failure
/// modes in `Output` rather than panicking.
pub trait TaskAdapter: Send + Sync {
    type Params: Send;
    type Output: Send;

    /// Seed the initial [`TaskState`] for a fresh task.
    fn initial_state(&self, task_id: &str, params: Self::Params) -> TaskState;

    /// Extract the domain output from a finished (or suspended) state.
    fn parse_result(&self, state: &TaskState) -> Self::Output;
}

/// Completed run of a wrapped task: the parsed output plus the status the
/// traversal ended in, so callers can distinguish a suspended task from a
/// terminal one without re-reading state.
#[derive(Clone, Debug)]
pub struct TaskRun<O> {
    pub status: TaskStatus,
    pub output: O,
}

/// A workflow bound to a [`TaskAdapter`] and an executor.
pub struct TaskWrapper<A: TaskAdapter> {
    adapter: A,
    executor: TaskExecutor,
    default_task_id: Option<String>,
}

impl<A: TaskAdapter> TaskWrapper<A> {
    /// Build a wrapper, constructing the executor from `config`.
    pub async fn new(
        adapter: A,
        workflow: Arc<Workflow>,
        config: RuntimeConfig,
    ) -> Result<Self, ExecutorError> {
        let default_task_id = config.task_id.clone();
        let executor = TaskExecutor::new(workflow, config).await?;
        Ok(Self {
            adapter,
            executor,
            default_task_id,
        })
    }

    /// Build a wrapper around an already-constructed executor.
    #[must_use]
    pub fn with_executor(adapter: A, executor: TaskExecutor) -> Self {
        Self {
            adapter,
            executor,
            default_task_id: None,
        }
    }

    /// The underlying executor, for cancel / submit_human_response and
    /// checkpoint inspection.
    #[must_use]
    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Run a task from typed parameters and parse the typed output.
    ///
    /// Transparently continues a previously checkpointed `task_id`; the
    /// provided params only seed state for a genuinely new task.
    #[instrument(skip(self, params), err)]
    pub async fn run(
        &self,
        task_id: &str,
        params: A::Params,
    ) -> Result<TaskRun<A::Output>, ExecutorError> {
        let initial = self.adapter.initial_state(task_id, params);
        let state = self.executor.invoke(initial).await?;
        Ok(TaskRun {
            status: state.status,
            output: self.adapter.parse_result(&state),
        })
    }

    /// Run a task without choosing an id: uses the id from the
    /// [`RuntimeConfig`] this wrapper was built with, or generates one.
    /// Returns the id alongside the run so the caller can resume or cancel
    /// later.
    pub async fn start(
        &self,
        params: A::Params,
    ) -> Result<(String, TaskRun<A::Output>), ExecutorError> {
        let task_id = self
            .default_task_id
            .clone()
            .unwrap_or_else(|| IdGenerator::new().generate_task_id());
        let run = self.run(&task_id, params).await?;
        Ok((task_id, run))
    }

    /// Resume a checkpointed task and parse the typed output.
    #[instrument(skip(self), err)]
    pub async fn resume(&self, task_id: &str) -> Result<TaskRun<A::Output>, ExecutorError> {
        let state = self.executor.resume(task_id).await?;
        Ok(TaskRun {
            status: state.status,
            output: self.adapter.parse_result(&state),
        })
    }
}

impl<A: TaskAdapter> std::fmt::Debug for TaskWrapper<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskWrapper").finish_non_exhaustive()
    }
}
