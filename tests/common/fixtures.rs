//! Workflow fixtures shared across integration tests.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use taskloom::gate::{self, GateConfig, HumanGate, HumanNotifier};
use taskloom::graph::GraphBuilder;
use taskloom::retry::{self, bounded_retry_router};
use taskloom::runtime::{InMemoryCheckpointer, TaskExecutor};
use taskloom::types::NodeKind;
use taskloom::workflow::Workflow;

use super::nodes::{ActionNode, CountingNode, FixNode, MessageNode, ReviewNode, ScriptedValidator};

/// `Start -> a -> b -> End`, with execution counters for both nodes.
pub fn counting_linear_workflow() -> (Workflow, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let (a, a_calls) = CountingNode::new("a");
    let (b, b_calls) = CountingNode::new("b");
    let workflow = GraphBuilder::new()
        .add_node("a", a)
        .add_node("b", b)
        .add_edge(NodeKind::Start, "a")
        .add_edge("a", "b")
        .add_edge("b", NodeKind::End)
        .compile()
        .expect("linear graph compiles");
    (workflow, a_calls, b_calls)
}

/// Validate/fix retry loop with a scripted validator and an escalation node.
///
/// `Start -> validate`, then `done -> End`, `fix -> fix -> validate`,
/// `review -> review -> End`.
pub fn retry_workflow(
    outcomes: Vec<bool>,
    max_retries: u32,
) -> (Workflow, Arc<AtomicUsize>) {
    let (validator, validate_calls) = ScriptedValidator::new(outcomes);
    let workflow = GraphBuilder::new()
        .add_node("validate", validator)
        .add_node("fix", FixNode)
        .add_node("review", ReviewNode)
        .add_edge(NodeKind::Start, "validate")
        .add_conditional_edges(
            "validate",
            bounded_retry_router(max_retries),
            [
                (retry::LABEL_DONE, NodeKind::End),
                (retry::LABEL_FIX, NodeKind::from("fix")),
                (retry::LABEL_REVIEW, NodeKind::from("review")),
            ],
        )
        .add_edge("fix", "validate")
        .add_edge("review", NodeKind::End)
        .compile()
        .expect("retry graph compiles");
    (workflow, validate_calls)
}

/// Draft -> approval gate -> publish/reject workflow.
///
/// The gate suspends until a decision or the timeout; `waiting` loops back
/// to the gate itself.
pub fn gate_workflow(notifier: Arc<dyn HumanNotifier>, timeout: chrono::Duration) -> Workflow {
    let gate_node = HumanGate::new(
        notifier,
        GateConfig::new(timeout, "rejected", "approve the draft?"),
    );
    GraphBuilder::new()
        .add_node("draft", MessageNode { name: "draft" })
        .add_node("approval", gate_node)
        .add_node("publish", ActionNode { name: "publish", action: "PUBLISHED" })
        .add_node("reject", ActionNode { name: "reject", action: "REJECTED" })
        .add_edge(NodeKind::Start, "draft")
        .add_edge("draft", "approval")
        .add_conditional_edges(
            "approval",
            gate::gate_router(),
            [
                (gate::LABEL_APPROVED, NodeKind::from("publish")),
                (gate::LABEL_REJECTED, NodeKind::from("reject")),
                (gate::LABEL_WAITING, NodeKind::from("approval")),
            ],
        )
        .add_edge("publish", NodeKind::End)
        .add_edge("reject", NodeKind::End)
        .compile()
        .expect("gate graph compiles")
}

/// Executor over an in-memory store, with the store handle kept for
/// checkpoint assertions.
pub fn memory_executor(workflow: Workflow) -> (TaskExecutor, Arc<InMemoryCheckpointer>) {
    let store = Arc::new(InMemoryCheckpointer::new());
    let executor = TaskExecutor::with_checkpointer(Arc::new(workflow), store.clone());
    (executor, store)
}
