//! Graph compilation logic and validation.
//!
//! This module contains the logic for compiling a GraphBuilder into an
//! executable [`Workflow`], including the structural validation that keeps
//! configuration mistakes out of running traversals.

use miette::Diagnostic;
use thiserror::Error;

use crate::types::NodeKind;
use crate::workflow::Workflow;

/// Structural errors detected when compiling a graph.
///
/// Compilation is the single place where topology mistakes surface; a graph
/// that compiles can only fail at runtime through node errors or router
/// labels outside the declared map.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphValidationError {
    #[error("duplicate node name: {node}")]
    #[diagnostic(
        code(taskloom::graph::duplicate_node),
        help("Every node name must be unique within the graph.")
    )]
    DuplicateNode { node: NodeKind },

    #[error("no entry node: the graph has no edge from Start")]
    #[diagnostic(
        code(taskloom::graph::missing_entry),
        help("Add exactly one edge from NodeKind::Start to the entry node.")
    )]
    MissingEntry,

    #[error("multiple entry edges from Start")]
    #[diagnostic(
        code(taskloom::graph::multiple_entry),
        help("A graph has exactly one entry node; remove the extra Start edges.")
    )]
    MultipleEntry,

    #[error("edge from unregistered node: {from}")]
    #[diagnostic(
        code(taskloom::graph::unknown_edge_source),
        help("Register the node with add_node before wiring edges from it.")
    )]
    UnknownEdgeSource { from: NodeKind },

    #[error("edge from {from} targets unregistered node: {to}")]
    #[diagnostic(
        code(taskloom::graph::unknown_edge_target),
        help("Register the target node, or route to NodeKind::End to terminate.")
    )]
    UnknownEdgeTarget { from: NodeKind, to: NodeKind },

    #[error("node {from} has more than one fixed successor")]
    #[diagnostic(
        code(taskloom::graph::multiple_successors),
        help("Use add_conditional_edges when a node needs more than one outgoing route.")
    )]
    MultipleFixedSuccessors { from: NodeKind },

    #[error("node {from} has conflicting outgoing transitions")]
    #[diagnostic(
        code(taskloom::graph::conflicting_edges),
        help("A node has either one fixed edge or one conditional edge, never both.")
    )]
    ConflictingEdges { from: NodeKind },

    #[error("router label '{label}' on {from} maps to unregistered node: {to}")]
    #[diagnostic(
        code(taskloom::graph::unknown_route_target),
        help("Every label in a conditional edge map must name a registered node or End.")
    )]
    UnknownRouteTarget {
        from: NodeKind,
        label: String,
        to: NodeKind,
    },

    #[error("node {node} has no outgoing transition")]
    #[diagnostic(
        code(taskloom::graph::dead_end),
        help(
            "Wire the node onward with add_edge or add_conditional_edges, or register it \
             with add_routing_node if it chooses its own successor."
        )
    )]
    DeadEnd { node: NodeKind },
}

/// Compilation logic for GraphBuilder.
impl super::builder::GraphBuilder {
    /// Compiles the graph into an executable [`Workflow`].
    ///
    /// Validation checks, in order:
    ///
    /// - no node name registered twice
    /// - exactly one entry edge from `Start`
    /// - every fixed edge leaves a registered node and lands on a
    ///   registered node or `End`
    /// - no node has more than one fixed successor
    /// - no node has both a fixed and a conditional edge (or two
    ///   conditional edges)
    /// - every conditional-edge label maps to a registered node or `End`
    /// - every non-routing node has some outgoing transition
    ///
    /// Cycles are deliberately not rejected; loop-backs (retry loops, gate
    /// self-loops) are a feature.
    ///
    /// # Examples
    ///
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
    ///     .add_node(NodeKind::Custom("process".into()), MyNode)
    ///     .add_edge(NodeKind::Start, NodeKind::Custom("process".into()))
    ///     .add_edge(NodeKind::Custom("process".into()), NodeKind::End)
    ///     .compile()
    ///     .unwrap();
    ///
    /// assert_eq!(workflow.entry(), &NodeKind::Custom("process".into()));
    /// ```
    pub fn compile(self) -> Result<Workflow, GraphValidationError> {
        if let Some(node) = self.duplicates.first() {
            return Err(GraphValidationError::DuplicateNode { node: node.clone() });
        }

        // Entry: exactly one fixed edge out of Start.
        let entry = match self.edges.get(&NodeKind::Start) {
            None => return Err(GraphValidationError::MissingEntry),
            Some(targets) if targets.is_empty() => return Err(GraphValidationError::MissingEntry),
            Some(targets) if targets.len() > 1 => {
                return Err(GraphValidationError::MultipleEntry);
            }
            Some(targets) => targets[0].clone(),
        };
        if !self.nodes.contains_key(&entry) {
            return Err(GraphValidationError::UnknownEdgeTarget {
                from: NodeKind::Start,
                to: entry,
            });
        }

        // Fixed edges: registered source, registered (or End) target, at most one per node.
        for (from, targets) in &self.edges {
            if from.is_start() {
                continue;
            }
            if !self.nodes.contains_key(from) {
                return Err(GraphValidationError::UnknownEdgeSource { from: from.clone() });
            }
            if targets.len() > 1 {
                return Err(GraphValidationError::MultipleFixedSuccessors { from: from.clone() });
            }
            for to in targets {
                let known = to.is_end() || self.nodes.contains_key(to);
                if !known {
                    return Err(GraphValidationError::UnknownEdgeTarget {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        // Conditional edges: registered source, no overlap with fixed edges,
        // one per node, fully mapped labels.
        let mut conditional_sources: Vec<&NodeKind> = Vec::new();
        for edge in &self.conditional_edges {
            let from = edge.from();
            if !self.nodes.contains_key(from) {
                return Err(GraphValidationError::UnknownEdgeSource { from: from.clone() });
            }
            let has_fixed = self
                .edges
                .get(from)
                .map(|targets| !targets.is_empty())
                .unwrap_or(false);
            if has_fixed || conditional_sources.contains(&from) {
                return Err(GraphValidationError::ConflictingEdges { from: from.clone() });
            }
            conditional_sources.push(from);

            for (label, to) in edge.targets() {
                let known = to.is_end() || self.nodes.contains_key(to);
                if !known {
                    return Err(GraphValidationError::UnknownRouteTarget {
                        from: from.clone(),
                        label: label.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        // Dead ends: every non-routing node needs a way out.
        for node in self.nodes.keys() {
            let has_fixed = self
                .edges
                .get(node)
                .map(|targets| !targets.is_empty())
                .unwrap_or(false);
            let has_conditional = conditional_sources.contains(&node);
            let is_routing = self.routing_nodes.contains(node);
            if !has_fixed && !has_conditional && !is_routing {
                return Err(GraphValidationError::DeadEnd { node: node.clone() });
            }
        }

        tracing::debug!(
            nodes = self.nodes.len(),
            conditional_edges = self.conditional_edges.len(),
            entry = %entry,
            "graph compiled"
        );

        Ok(Workflow::from_parts(
            self.nodes,
            self.routing_nodes,
            self.edges,
            self.conditional_edges,
            entry,
            self.runtime_config,
        ))
    }
}
