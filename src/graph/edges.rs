//! Edge types and routers for conditional graph flow.
//!
//! Conditional edges separate decision logic from topology: a pure router
//! function maps the current state snapshot to a label, and a declared
//! label map resolves the label to a successor node. The label map is part
//! of the graph definition, so every possible route is known and validated
//! at compile time.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Router function for conditional edge routing.
///
/// Takes a [`StateSnapshot`] and returns a label that is resolved against
/// the edge's declared label map. Routers must be pure and deterministic:
/// the executor may re-evaluate them when resuming from a checkpoint, so a
/// router that consults anything other than its snapshot breaks crash
/// recovery.
///
/// # Examples
///
/// ```
/// use taskloom::graph::RouterFn;
/// use std::sync::Arc;
///
/// let route_by_priority: RouterFn = Arc::new(|snapshot| {
///     match snapshot.extra.get("priority").and_then(|v| v.as_str()) {
///         Some("high") => "high".to_string(),
///         _ => "low".to_string(),
///     }
/// });
/// ```
pub type RouterFn = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync + 'static>;

/// A conditional edge: a source node, a router, and a label map.
///
/// When a traversal leaves the `from` node, the router is evaluated against
/// the freshly merged state and its label is looked up in `targets`. A label
/// with no mapping is a configuration error that fails the task; routing
/// never falls through silently.
#[derive(Clone)]
pub struct ConditionalEdge {
    /// The source node for this conditional edge.
    from: NodeKind,
    /// Pure decision function evaluated after the source node runs.
    router: RouterFn,
    /// Declared mapping from router labels to successor nodes.
    targets: FxHashMap<String, NodeKind>,
}

impl ConditionalEdge {
    /// Creates a new conditional edge.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskloom::graph::{ConditionalEdge, RouterFn};
    /// use taskloom::types::NodeKind;
    /// use rustc_hash::FxHashMap;
    /// use std::sync::Arc;
    ///
    /// let router: RouterFn = Arc::new(|_snapshot| "done".to_string());
    /// let mut targets = FxHashMap::default();
    /// targets.insert("done".to_string(), NodeKind::End);
    ///
    /// let edge = ConditionalEdge::new(NodeKind::Custom("validate".into()), router, targets);
    /// assert_eq!(edge.resolve("done"), Some(&NodeKind::End));
    /// ```
    pub fn new(
        from: impl Into<NodeKind>,
        router: RouterFn,
        targets: FxHashMap<String, NodeKind>,
    ) -> Self {
        Self {
            from: from.into(),
            router,
            targets,
        }
    }

    /// Returns the source node of this conditional edge.
    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    /// Returns the router function of this conditional edge.
    pub fn router(&self) -> &RouterFn {
        &self.router
    }

    /// Returns the declared label map.
    pub fn targets(&self) -> &FxHashMap<String, NodeKind> {
        &self.targets
    }

    /// Resolves a router label to its declared successor, if mapped.
    pub fn resolve(&self, label: &str) -> Option<&NodeKind> {
        self.targets.get(label)
    }
}

impl std::fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}
