//! Task execution engine.
//!
//! [`TaskExecutor`] drives one node at a time through a compiled
//! [`Workflow`], persisting a checkpoint after every node execution and
//! before any routing decision. Within a task everything is strictly
//! sequential; across tasks, traversals are independent futures serialized
//! per task id.
//!
//! # Execution protocol
//!
//! - [`invoke`](TaskExecutor::invoke) starts (or transparently resumes) a
//!   task and runs until a terminal status or a `WaitingHuman` suspension.
//! - [`resume`](TaskExecutor::resume) continues a checkpointed task;
//!   resuming a terminal task returns its stored state without executing
//!   any node.
//! - [`submit_human_response`](TaskExecutor::submit_human_response) records
//!   an external decision against a suspended task.
//! - [`cancel`](TaskExecutor::cancel) requests cooperative cancellation,
//!   honored before the next node execution.
//!
//! Node failures do not surface as `Err`: the failed state (with its
//! [`ErrorInfo`]) is checkpointed and returned as `Ok`, so task adapters can
//! always parse a result. Configuration errors (unmapped router labels,
//! illegal successor overrides) persist a `Failed` checkpoint and then
//! return `Err`.

use std::sync::Arc;

use chrono::Utc;
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::instrument;

use crate::gate;
use crate::message::Message;
use crate::node::NodeContext;
use crate::runtime::checkpointer::{
    Checkpoint, Checkpointer, CheckpointerError, CheckpointerType, InMemoryCheckpointer,
};
use crate::runtime::config::RuntimeConfig;
use crate::state::{ErrorInfo, StateSnapshot, TaskState};
use crate::types::{NodeKind, TaskStatus};
use crate::workflow::Workflow;

#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    #[error("task not found: {task_id}")]
    #[diagnostic(
        code(taskloom::executor::task_not_found),
        help("resume and submit_human_response require an existing checkpoint; use invoke to start a task.")
    )]
    TaskNotFound { task_id: String },

    #[error("router on {node} returned unmapped label '{label}'")]
    #[diagnostic(
        code(taskloom::executor::unmapped_label),
        help("Every label a router can return must appear in its add_conditional_edges map.")
    )]
    UnmappedRouteLabel { node: NodeKind, label: String },

    #[error("node {node} is not a routing node but emitted successor override to {target}")]
    #[diagnostic(
        code(taskloom::executor::illegal_override),
        help("Register the node with add_routing_node if it should choose its own successor.")
    )]
    IllegalOverride { node: NodeKind, target: NodeKind },

    #[error("route from {node} targets unknown node: {target}")]
    #[diagnostic(code(taskloom::executor::unknown_route_target))]
    UnknownRouteTarget { node: NodeKind, target: NodeKind },

    #[error("no outgoing transition from {node}")]
    #[diagnostic(
        code(taskloom::executor::no_route),
        help("A routing node that emits no override must still have a declared edge to fall back on.")
    )]
    NoRoute { node: NodeKind },

    #[error(transparent)]
    #[diagnostic(code(taskloom::executor::checkpointer))]
    Checkpointer(#[from] CheckpointerError),
}

/// Runtime execution engine for compiled workflows.
///
/// # Architecture: Workflow vs TaskExecutor
///
/// - **`Workflow`**: the graph structure (nodes, edges, routing rules)
/// - **`TaskExecutor`**: the runtime environment (checkpointer, per-task
///   locks, cancellation flags, wall-clock budget)
///
/// One executor serves any number of tasks; concurrent calls against the
/// same task id queue on a per-task lock so state writes never interleave.
pub struct TaskExecutor {
    workflow: Arc<Workflow>,
    checkpointer: Arc<dyn Checkpointer>,
    budget: Option<chrono::Duration>,
    locks: Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    cancelled: Mutex<FxHashSet<String>>,
}

impl TaskExecutor {
    /// Build an executor from a workflow and runtime configuration,
    /// constructing the configured checkpointer backend.
    pub async fn new(
        workflow: Arc<Workflow>,
        config: RuntimeConfig,
    ) -> Result<Self, ExecutorError> {
        let checkpointer_type = config.checkpointer.unwrap_or(CheckpointerType::InMemory);
        let checkpointer =
            Self::create_checkpointer(checkpointer_type, config.sqlite_db_name.clone()).await?;
        Ok(Self {
            workflow,
            checkpointer,
            budget: config.budget,
            locks: Mutex::new(FxHashMap::default()),
            cancelled: Mutex::new(FxHashSet::default()),
        })
    }

    /// Build an executor around an existing checkpointer.
    ///
    /// Useful for sharing one store across executors and for tests.
    #[must_use]
    pub fn with_checkpointer(workflow: Arc<Workflow>, checkpointer: Arc<dyn Checkpointer>) -> Self {
        let budget = workflow.runtime_config().budget;
        Self {
            workflow,
            checkpointer,
            budget,
            locks: Mutex::new(FxHashMap::default()),
            cancelled: Mutex::new(FxHashSet::default()),
        }
    }

    #[cfg_attr(not(feature = "sqlite"), allow(unused_variables))]
    async fn create_checkpointer(
        checkpointer_type: CheckpointerType,
        sqlite_db_name: Option<String>,
    ) -> Result<Arc<dyn Checkpointer>, ExecutorError> {
        match checkpointer_type {
            CheckpointerType::InMemory => Ok(Arc::new(InMemoryCheckpointer::new())),
            #[cfg(feature = "sqlite")]
            CheckpointerType::Sqlite => {
                let db_url = std::env::var("TASKLOOM_SQLITE_URL")
                    .ok()
                    .or_else(|| {
                        sqlite_db_name
                            .as_ref()
                            .map(|name| format!("sqlite://{name}"))
                    })
                    .unwrap_or_else(|| {
                        let fallback = std::env::var("SQLITE_DB_NAME")
                            .unwrap_or_else(|_| "taskloom.db".to_string());
                        format!("sqlite://{fallback}")
                    });
                // Ensure the underlying sqlite file exists before connecting.
                if let Some(path) = db_url.strip_prefix("sqlite://") {
                    let path = path.trim();
                    if !path.is_empty() {
                        let p = std::path::Path::new(path);
                        if let Some(parent) = p.parent() {
                            let _ = std::fs::create_dir_all(parent);
                        }
                        if !p.exists() {
                            // Ignore result; if it already exists or we lack permission we proceed anyway.
                            let _ = std::fs::File::create_new(p);
                        }
                    }
                }
                let cp = crate::runtime::SQLiteCheckpointer::connect(&db_url).await?;
                Ok(Arc::new(cp) as Arc<dyn Checkpointer>)
            }
        }
    }

    /// The checkpoint store this executor persists through.
    #[must_use]
    pub fn checkpointer(&self) -> Arc<dyn Checkpointer> {
        self.checkpointer.clone()
    }

    fn task_lock(&self, task_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(task_id.to_string())
            .or_default()
            .clone()
    }

    /// Request cooperative cancellation of a task.
    ///
    /// Takes effect before the next node execution; the traversal persists
    /// a `Failed` checkpoint recording the cancellation. Cancelling an idle
    /// task id flags its next traversal.
    pub fn cancel(&self, task_id: &str) {
        tracing::info!(task = %task_id, "cancellation requested");
        self.cancelled.lock().insert(task_id.to_string());
    }

    fn take_cancelled(&self, task_id: &str) -> bool {
        self.cancelled.lock().remove(task_id)
    }

    /// Start a task, or continue it if a checkpoint already exists.
    ///
    /// Runs until a terminal status or a `WaitingHuman` suspension and
    /// returns the final state. A task whose stored status is already
    /// terminal is returned as-is without executing any node.
    #[instrument(skip(self, initial_state), fields(task = %initial_state.task_id), err)]
    pub async fn invoke(&self, initial_state: TaskState) -> Result<TaskState, ExecutorError> {
        let task_id = initial_state.task_id.clone();
        let lock = self.task_lock(&task_id);
        let _guard = lock.lock().await;

        match self.checkpointer.load_latest(&task_id).await? {
            Some(cp) if cp.state.status.is_terminal() => {
                tracing::info!(task = %task_id, status = %cp.state.status, "task already terminal");
                Ok(cp.state)
            }
            Some(cp) => {
                tracing::info!(task = %task_id, sequence = cp.sequence, "continuing from checkpoint");
                self.run_from(cp.node, cp.route_hint, cp.state, cp.sequence)
                    .await
            }
            None => {
                tracing::info!(task = %task_id, "starting task");
                self.run_from(NodeKind::Start, None, initial_state, 0).await
            }
        }
    }

    /// Resume a previously checkpointed task.
    ///
    /// Identical to [`invoke`](Self::invoke) except that a task with no
    /// checkpoint is an error rather than a fresh start.
    #[instrument(skip(self), err)]
    pub async fn resume(&self, task_id: &str) -> Result<TaskState, ExecutorError> {
        let lock = self.task_lock(task_id);
        let _guard = lock.lock().await;

        match self.checkpointer.load_latest(task_id).await? {
            None => Err(ExecutorError::TaskNotFound {
                task_id: task_id.to_string(),
            }),
            Some(cp) if cp.state.status.is_terminal() => {
                tracing::info!(task = %task_id, status = %cp.state.status, "task already terminal");
                Ok(cp.state)
            }
            Some(cp) => {
                self.run_from(cp.node, cp.route_hint, cp.state, cp.sequence)
                    .await
            }
        }
    }

    /// Record an external human decision against a suspended task.
    ///
    /// Writes the decision into the task's state under the gate's
    /// well-known key and persists it at the next sequence number. The
    /// caller then [`resume`](Self::resume)s the task so the gate can route
    /// on the decision.
    #[instrument(skip(self), err)]
    pub async fn submit_human_response(
        &self,
        task_id: &str,
        decision: &str,
    ) -> Result<(), ExecutorError> {
        let lock = self.task_lock(task_id);
        let _guard = lock.lock().await;

        let cp = self
            .checkpointer
            .load_latest(task_id)
            .await?
            .ok_or_else(|| ExecutorError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        let mut state = cp.state;
        state.extra.insert(
            gate::HUMAN_RESPONSE_KEY.to_string(),
            serde_json::Value::String(decision.to_string()),
        );
        state.messages.push(Message::human(decision));

        self.checkpointer
            .save(Checkpoint::new(
                task_id,
                cp.node,
                cp.sequence + 1,
                state,
                cp.route_hint,
            ))
            .await?;
        Ok(())
    }

    /// The main traversal loop.
    ///
    /// `last_node` is the most recently executed node (`Start` when nothing
    /// ran yet); routing is re-derived from it, except where `route_hint`
    /// carries a persisted routing-node override.
    async fn run_from(
        &self,
        mut last_node: NodeKind,
        mut route_hint: Option<NodeKind>,
        mut state: TaskState,
        mut sequence: u64,
    ) -> Result<TaskState, ExecutorError> {
        let task_id = state.task_id.clone();

        loop {
            // Resolve the node to execute next.
            let current = if last_node.is_start() {
                self.workflow.entry().clone()
            } else {
                match self.next_node(&last_node, &state.snapshot(), route_hint.take()) {
                    Ok(next) => next,
                    Err(err) => {
                        self.persist_failure(&mut state, sequence + 1, &last_node, &err.to_string())
                            .await;
                        return Err(err);
                    }
                }
            };

            if current.is_end() {
                if state.status == TaskStatus::Running {
                    state.status = TaskStatus::Completed;
                }
                sequence += 1;
                self.checkpointer
                    .save(Checkpoint::new(
                        &task_id,
                        NodeKind::End,
                        sequence,
                        state.clone(),
                        None,
                    ))
                    .await?;
                tracing::info!(task = %task_id, status = %state.status, sequence, "traversal finished");
                return Ok(state);
            }

            // Cooperative cancellation, honored between node executions.
            if self.take_cancelled(&task_id) {
                self.persist_failure(&mut state, sequence + 1, &current, "task cancelled")
                    .await;
                return Ok(state);
            }

            // Wall-clock budget, measured from task creation.
            if let Some(budget) = self.budget {
                let elapsed = Utc::now().signed_duration_since(state.started_at);
                if elapsed > budget {
                    self.persist_failure(
                        &mut state,
                        sequence + 1,
                        &current,
                        "wall-clock budget exceeded",
                    )
                    .await;
                    return Ok(state);
                }
            }

            let node = match self.workflow.nodes().get(&current) {
                Some(node) => node.clone(),
                None => {
                    // Unreachable for compiled graphs; a decoded route hint
                    // from an incompatible graph revision can land here.
                    let err = ExecutorError::UnknownRouteTarget {
                        node: last_node.clone(),
                        target: current.clone(),
                    };
                    self.persist_failure(&mut state, sequence + 1, &last_node, &err.to_string())
                        .await;
                    return Err(err);
                }
            };

            state.status = TaskStatus::Running;
            let ctx = NodeContext {
                node_id: current.to_string(),
                task_id: task_id.clone(),
                sequence: sequence + 1,
            };

            tracing::debug!(task = %task_id, node = %current, sequence = sequence + 1, "executing node");
            match node.run(state.snapshot(), ctx).await {
                Ok(update) => {
                    let override_target = update.next_node.clone();
                    state.apply_update(update);
                    sequence += 1;

                    // Successor overrides are only legal from routing nodes.
                    if let Some(target) = override_target.as_ref() {
                        if !self.workflow.is_routing_node(&current) {
                            let err = ExecutorError::IllegalOverride {
                                node: current.clone(),
                                target: target.clone(),
                            };
                            self.persist_failure(&mut state, sequence, &current, &err.to_string())
                                .await;
                            return Err(err);
                        }
                    }

                    // Checkpoint after every node execution, before routing.
                    self.checkpointer
                        .save(Checkpoint::new(
                            &task_id,
                            current.clone(),
                            sequence,
                            state.clone(),
                            override_target.clone(),
                        ))
                        .await?;

                    if state.status == TaskStatus::WaitingHuman {
                        tracing::info!(task = %task_id, node = %current, "suspended awaiting human decision");
                        return Ok(state);
                    }
                    if state.status.is_terminal() {
                        tracing::info!(task = %task_id, status = %state.status, "node set terminal status");
                        return Ok(state);
                    }

                    last_node = current;
                    route_hint = override_target;
                }
                Err(node_err) => {
                    sequence += 1;
                    self.persist_failure(&mut state, sequence, &current, &node_err.to_string())
                        .await;
                    return Ok(state);
                }
            }
        }
    }

    /// Resolve the successor of `from`: persisted override first, then the
    /// conditional edge's router, then the fixed edge.
    fn next_node(
        &self,
        from: &NodeKind,
        snapshot: &StateSnapshot,
        route_hint: Option<NodeKind>,
    ) -> Result<NodeKind, ExecutorError> {
        if let Some(target) = route_hint {
            let known = target.is_end() || self.workflow.nodes().contains_key(&target);
            if !known {
                return Err(ExecutorError::UnknownRouteTarget {
                    node: from.clone(),
                    target,
                });
            }
            tracing::debug!(from = %from, target = %target, "following successor override");
            return Ok(target);
        }

        if let Some(edge) = self.workflow.conditional_edge_from(from) {
            let label = (edge.router())(snapshot);
            tracing::debug!(from = %from, label = %label, "router evaluated");
            return edge
                .resolve(&label)
                .cloned()
                .ok_or_else(|| ExecutorError::UnmappedRouteLabel {
                    node: from.clone(),
                    label,
                });
        }

        if let Some(next) = self.workflow.fixed_successor(from) {
            return Ok(next.clone());
        }

        Err(ExecutorError::NoRoute { node: from.clone() })
    }

    /// Mark the state failed and persist a final checkpoint.
    ///
    /// Persistence failures here are logged, not propagated: the caller is
    /// already on an error path and the failed state is still returned.
    async fn persist_failure(
        &self,
        state: &mut TaskState,
        sequence: u64,
        node: &NodeKind,
        message: &str,
    ) {
        state.status = TaskStatus::Failed;
        state.error = Some(ErrorInfo::new(node.to_string(), message));
        state.messages.push(Message::engine(message));
        let checkpoint = Checkpoint::new(
            state.task_id.clone(),
            node.clone(),
            sequence,
            state.clone(),
            None,
        );
        if let Err(save_err) = self.checkpointer.save(checkpoint).await {
            tracing::error!(
                task = %state.task_id,
                error = %save_err,
                "could not persist failure checkpoint"
            );
        }
    }
}
