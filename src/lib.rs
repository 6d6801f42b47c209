/*!
# Taskloom

A workflow engine for long-running, resumable tasks: declare a directed
graph of nodes, compile it into a [`Workflow`](workflow::Workflow), and let
the [`TaskExecutor`](runtime::TaskExecutor) walk it one node at a time with
a durable checkpoint after every step.

## Core ideas

- **Nodes** implement the async [`Node`](node::Node) trait and return a
  partial [`NodeUpdate`](node::NodeUpdate); the executor merges updates
  into the shared [`TaskState`](state::TaskState).
- **Routing** is declarative: fixed edges, or conditional edges whose pure
  router maps the current state snapshot to a label, resolved through a
  declared label map. Routing nodes may instead emit an explicit successor
  override.
- **Checkpoints** are persisted after every node execution and before any
  routing decision, so a crash or restart resumes exactly where the task
  left off (see [`runtime::Checkpointer`]).
- **Suspension**: a node can park the task in `WAITING_HUMAN`; an external
  decision (or a timeout fallback) releases it. The reusable
  [`HumanGate`](gate::HumanGate) packages this pattern.
- **Bounded retries**: [`retry::bounded_retry_router`] terminates
  validate/fix loops into a `NEEDS_REVIEW` escalation.

## Quick start

```rust,no_run
use async_trait::async_trait;
use taskloom::graph::GraphBuilder;
use taskloom::message::Message;
use taskloom::node::{Node, NodeContext, NodeError, NodeUpdate};
use taskloom::state::{StateSnapshot, TaskState};
use taskloom::types::NodeKind;

struct Greet;

#[async_trait]
impl Node for Greet {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodeUpdate, NodeError> {
        ctx.trace("greeting");
        Ok(NodeUpdate::new().with_messages(vec![Message::engine("hello")]))
    }
}

# async fn demo() -> miette::Result<()> {
let workflow = GraphBuilder::new()
    .add_node("greet", Greet)
    .add_edge(NodeKind::Start, "greet")
    .add_edge("greet", NodeKind::End)
    .compile()
    .map_err(miette::Report::new)?;

let finished = workflow
    .invoke(TaskState::new("task-1"))
    .await
    .map_err(miette::Report::new)?;
assert!(finished.status.is_terminal());
# Ok(())
# }
```
*/

pub mod gate;
pub mod graph;
pub mod message;
pub mod node;
pub mod retry;
pub mod runtime;
pub mod state;
pub mod task;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod workflow;
