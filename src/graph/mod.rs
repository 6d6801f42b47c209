//! Graph definition and compilation for workflow execution.
//!
//! This module provides the graph building functionality for declaring
//! workflows as nodes, fixed edges, and conditional edges. The main entry
//! point is [`GraphBuilder`], which uses a builder pattern to construct
//! graphs that compile into executable
//! [`Workflow`](crate::workflow::Workflow) instances.
//!
//! # Core Concepts
//!
//! - **Nodes**: Executable units of work implementing the [`Node`](crate::node::Node) trait
//! - **Fixed edges**: Static connections between nodes
//! - **Conditional edges**: A pure router plus a declared label map
//! - **Virtual markers**: `NodeKind::Start` names the entry, `NodeKind::End` terminates
//! - **Compilation**: Full structural validation, performed once up front
//!
//! # Quick Start
//!
//! ```
//! use taskloom::graph::GraphBuilder;
//! use taskloom::types::NodeKind;
//! use taskloom::node::{Node, NodeContext, NodeError, NodeUpdate};
//! use taskloom::state::StateSnapshot;
//! use async_trait::async_trait;
//!
//! struct MyNode;
//!
//! #[async_trait]
//! impl Node for MyNode {
//!     async fn run(&self, _: StateSnapshot, _: NodeContext) -> Result<NodeUpdate, NodeError> {
//!         Ok(NodeUpdate::default())
//!     }
//! }
//!
//! // Start (virtual) -> process -> End (virtual)
//! let workflow = GraphBuilder::new()
//!     .add_node(NodeKind::Custom("process".into()), MyNode)
//!     .add_edge(NodeKind::Start, NodeKind::Custom("process".into()))
//!     .add_edge(NodeKind::Custom("process".into()), NodeKind::End)
//!     .compile()
//!     .unwrap();
//! ```

// Internal module declarations
mod builder;
mod compile;
mod edges;

// Public re-exports
pub use builder::GraphBuilder;
pub use compile::GraphValidationError;
pub use edges::{ConditionalEdge, RouterFn};
