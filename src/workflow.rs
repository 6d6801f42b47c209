//! Compiled workflow graphs.
//!
//! A [`Workflow`] is the validated, immutable output of
//! [`GraphBuilder::compile`](crate::graph::GraphBuilder::compile): the node
//! registry, the topology, and the runtime configuration. Workflows carry no
//! execution state; a single `Workflow` can back any number of
//! [`TaskExecutor`](crate::runtime::TaskExecutor) instances and task
//! traversals.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::graph::ConditionalEdge;
use crate::node::Node;
use crate::runtime::{ExecutorError, RuntimeConfig, TaskExecutor};
use crate::state::TaskState;
use crate::types::NodeKind;

/// A compiled, validated workflow graph.
///
/// # Architecture: Workflow vs TaskExecutor
///
/// - **`Workflow`**: the graph structure (nodes, edges, routing rules)
/// - **`TaskExecutor`**: the runtime environment (checkpoints, task locks,
///   cancellation)
///
/// This separation allows one `Workflow` to be reused across executors with
/// different persistence backends.
#[derive(Clone)]
pub struct Workflow {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    routing_nodes: FxHashSet<NodeKind>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    conditional_edges: Vec<ConditionalEdge>,
    entry: NodeKind,
    runtime_config: RuntimeConfig,
}

impl Workflow {
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        routing_nodes: FxHashSet<NodeKind>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        conditional_edges: Vec<ConditionalEdge>,
        entry: NodeKind,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            nodes,
            routing_nodes,
            edges,
            conditional_edges,
            entry,
            runtime_config,
        }
    }

    /// The entry node, as named by the single edge out of `Start`.
    #[must_use]
    pub fn entry(&self) -> &NodeKind {
        &self.entry
    }

    /// Registry of executable nodes.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// Fixed edges keyed by source node.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    /// All conditional edges.
    #[must_use]
    pub fn conditional_edges(&self) -> &[ConditionalEdge] {
        &self.conditional_edges
    }

    /// Runtime configuration the graph was built with.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// The conditional edge leaving `from`, if one was declared.
    ///
    /// Compilation guarantees at most one per node.
    #[must_use]
    pub fn conditional_edge_from(&self, from: &NodeKind) -> Option<&ConditionalEdge> {
        self.conditional_edges.iter().find(|e| e.from() == from)
    }

    /// The fixed successor of `from`, if one was declared.
    #[must_use]
    pub fn fixed_successor(&self, from: &NodeKind) -> Option<&NodeKind> {
        self.edges.get(from).and_then(|targets| targets.first())
    }

    /// Whether `node` was registered through `add_routing_node` and may
    /// emit a successor override.
    #[must_use]
    pub fn is_routing_node(&self, node: &NodeKind) -> bool {
        self.routing_nodes.contains(node)
    }

    /// Run one task to completion (or suspension) with this workflow's
    /// configured checkpointer.
    ///
    /// This is the simple entry point; it builds a [`TaskExecutor`] from
    /// the workflow's [`RuntimeConfig`] per call. Applications that manage
    /// many tasks, need cancellation, or deliver human responses should
    /// construct and hold a `TaskExecutor` directly.
    pub async fn invoke(&self, initial_state: TaskState) -> Result<TaskState, ExecutorError> {
        let executor =
            TaskExecutor::new(Arc::new(self.clone()), self.runtime_config.clone()).await?;
        executor.invoke(initial_state).await
    }

    /// Resume a previously checkpointed task with this workflow's
    /// configured checkpointer.
    ///
    /// Note that resuming only makes sense against a durable backend; an
    /// in-memory checkpointer built per call starts empty.
    pub async fn resume(&self, task_id: &str) -> Result<TaskState, ExecutorError> {
        let executor =
            TaskExecutor::new(Arc::new(self.clone()), self.runtime_config.clone()).await?;
        executor.resume(task_id).await
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("conditional_edges", &self.conditional_edges.len())
            .finish_non_exhaustive()
    }
}
