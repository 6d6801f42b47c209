//! GraphBuilder implementation for constructing workflow graphs.
//!
//! This module contains the main GraphBuilder type and its fluent API for
//! declaring nodes, fixed edges, conditional edges, and runtime
//! configuration before compiling to an executable
//! [`Workflow`](crate::workflow::Workflow).

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use super::edges::{ConditionalEdge, RouterFn};
use crate::node::Node;
use crate::runtime::RuntimeConfig;
use crate::types::NodeKind;

/// Builder for constructing workflow graphs with a fluent API.
///
/// `GraphBuilder` collects nodes, edges, and configuration, then
/// [`compile`](Self::compile) validates the topology and produces a
/// [`Workflow`](crate::workflow::Workflow). All structural mistakes
/// (duplicate names, unknown targets, unmapped entry, dead ends) are
/// rejected at compile time, never during a traversal.
///
/// # Required Configuration
///
/// Every graph must have:
/// - At least one node added via [`add_node`](Self::add_node)
/// - Exactly one edge from `NodeKind::Start` naming the entry node
/// - Every non-routing node wired onward (fixed edge, conditional edge,
///   or a path to `NodeKind::End`)
///
/// `NodeKind::Start` and `NodeKind::End` are virtual markers and are never
/// registered with `add_node`.
///
/// # Examples
///
/// ## Simple Linear Workflow
/// ```
/// use taskloom::graph::GraphBuilder;
/// use taskloom::types::NodeKind;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl taskloom::node::Node for MyNode {
/// #     async fn run(&self, _: taskloom::state::StateSnapshot, _: taskloom::node::NodeContext) -> Result<taskloom::node::NodeUpdate, taskloom::node::NodeError> {
/// #         Ok(taskloom::node::NodeUpdate::default())
/// #     }
/// # }
///
/// let workflow = GraphBuilder::new()
///     .add_node(NodeKind::Custom("worker".into()), MyNode)
///     .add_edge(NodeKind::Start, NodeKind::Custom("worker".into()))
///     .add_edge(NodeKind::Custom("worker".into()), NodeKind::End)
///     .compile()
///     .unwrap();
/// ```
///
/// ## Conditional Routing
/// ```
/// use taskloom::graph::{GraphBuilder, RouterFn};
/// use taskloom::types::NodeKind;
/// use std::sync::Arc;
///
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl taskloom::node::Node for MyNode {
/// #     async fn run(&self, _: taskloom::state::StateSnapshot, _: taskloom::node::NodeContext) -> Result<taskloom::node::NodeUpdate, taskloom::node::NodeError> {
/// #         Ok(taskloom::node::NodeUpdate::default())
/// #     }
/// # }
///
/// let router: RouterFn = Arc::new(|snapshot| {
///     if snapshot.extra.get("is_valid").and_then(|v| v.as_bool()).unwrap_or(false) {
///         "done".to_string()
///     } else {
///         "fix".to_string()
///     }
/// });
///
/// let workflow = GraphBuilder::new()
///     .add_node(NodeKind::Custom("validate".into()), MyNode)
///     .add_node(NodeKind::Custom("fix".into()), MyNode)
///     .add_edge(NodeKind::Start, NodeKind::Custom("validate".into()))
///     .add_conditional_edges(
///         NodeKind::Custom("validate".into()),
///         router,
///         [
///             ("done", NodeKind::End),
///             ("fix", NodeKind::Custom("fix".into())),
///         ],
///     )
///     .add_edge(NodeKind::Custom("fix".into()), NodeKind::Custom("validate".into()))
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    /// Registry of all nodes in the graph, keyed by their identifier.
    pub(crate) nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    /// Nodes allowed to emit a successor override from their update.
    pub(crate) routing_nodes: FxHashSet<NodeKind>,
    /// Unconditional edges defining static graph topology.
    pub(crate) edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    /// Conditional edges for state-driven routing.
    pub(crate) conditional_edges: Vec<ConditionalEdge>,
    /// Node names registered more than once; rejected at compile time.
    pub(crate) duplicates: Vec<NodeKind>,
    /// Runtime configuration for the compiled workflow.
    pub(crate) runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            routing_nodes: FxHashSet::default(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            duplicates: Vec::new(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Adds a node to the graph.
    ///
    /// Registers a node implementation under the given identifier. Each
    /// node must have a unique [`NodeKind`] within the graph; registering
    /// the same name twice is a compile-time error.
    ///
    /// NOTE: `NodeKind::Start` and `NodeKind::End` are virtual structural
    /// markers. If either is passed to `add_node`, the registration is
    /// ignored and a warning is emitted; they are never executed.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeKind>, node: impl Node + 'static) -> Self {
        let id = id.into();
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "Ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                if self.nodes.insert(id.clone(), Arc::new(node)).is_some() {
                    self.duplicates.push(id);
                }
            }
        }
        self
    }

    /// Adds a routing node to the graph.
    ///
    /// Routing nodes are regular nodes that are additionally permitted to
    /// emit a successor override via
    /// [`NodeUpdate::with_next_node`](crate::node::NodeUpdate::with_next_node).
    /// An override from a node not registered this way fails the task at
    /// runtime.
    #[must_use]
    pub fn add_routing_node(mut self, id: impl Into<NodeKind>, node: impl Node + 'static) -> Self {
        let id = id.into();
        self.routing_nodes.insert(id.clone());
        self.add_node(id, node)
    }

    /// Adds an unconditional edge between two nodes.
    ///
    /// Each node may have at most one fixed successor; declaring more is a
    /// compile-time error. The single edge out of `NodeKind::Start` names
    /// the entry node.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeKind>, to: impl Into<NodeKind>) -> Self {
        self.edges.entry(from.into()).or_default().push(to.into());
        self
    }

    /// Adds a conditional edge with its label map.
    ///
    /// When a traversal leaves `from`, `router` is evaluated against the
    /// merged state and its label is resolved through `targets`. Every
    /// label a router can return must be mapped here; an unmapped label at
    /// runtime is a configuration error that fails the task.
    #[must_use]
    pub fn add_conditional_edges<L, T>(
        mut self,
        from: impl Into<NodeKind>,
        router: RouterFn,
        targets: T,
    ) -> Self
    where
        L: Into<String>,
        T: IntoIterator<Item = (L, NodeKind)>,
    {
        let targets: FxHashMap<String, NodeKind> = targets
            .into_iter()
            .map(|(label, node)| (label.into(), node))
            .collect();
        self.conditional_edges
            .push(ConditionalEdge::new(from, router, targets));
        self
    }

    /// Configures runtime settings for the compiled workflow.
    ///
    /// Controls the checkpointer backend, generated task ids, and the
    /// optional wall-clock budget. Defaults are used when not specified.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}
