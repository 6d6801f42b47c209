//! Core types for the Taskloom workflow engine.
//!
//! This module defines the fundamental types used throughout the system
//! for identifying graph nodes and tracking task lifecycle. These are the
//! core domain concepts that define what a workflow *is*.
//!
//! # Key Types
//!
//! - [`NodeKind`]: Identifies nodes in a workflow graph
//! - [`TaskStatus`]: Lifecycle state of one task traversal
//!
//! # Examples
//!
//! ```rust
//! use taskloom::types::{NodeKind, TaskStatus};
//!
//! let start = NodeKind::Start;
//! let custom = NodeKind::Custom("validate".to_string());
//!
//! // Encode for persistence
//! assert_eq!(custom.encode(), "Custom:validate");
//!
//! assert!(!TaskStatus::Running.is_terminal());
//! assert!(TaskStatus::NeedsReview.is_terminal());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `NodeKind` serves as a unique identifier for nodes in the workflow
/// execution graph. It provides special handling for the virtual entry and
/// terminal markers while allowing arbitrary application nodes through the
/// `Custom` variant.
///
/// # Persistence
///
/// `NodeKind` supports serialization for checkpointing through both serde
/// and the [`encode`](Self::encode)/[`decode`](Self::decode) methods.
///
/// # Examples
///
/// ```rust
/// use taskloom::types::NodeKind;
///
/// let processor = NodeKind::Custom("generate".to_string());
///
/// // Persistence round-trip
/// let encoded = processor.encode();
/// let decoded = NodeKind::decode(&encoded);
/// assert_eq!(processor, decoded);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry marker. Start is never implemented or executed; the
    /// single edge out of it names the graph's entry node.
    Start,

    /// Virtual terminal marker. Routing to End completes the traversal;
    /// End has no implementation and no outgoing edges.
    End,

    /// Application node identified by a user-defined string.
    ///
    /// The string should be descriptive and unique within the workflow.
    Custom(String),
}

impl NodeKind {
    /// Encode a NodeKind into its persisted string form.
    ///
    /// The encoding format is human-readable and forward-compatible:
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Custom("X")` → `"Custom:X"`
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use taskloom::types::NodeKind;
    /// assert_eq!(NodeKind::Start.encode(), "Start");
    /// assert_eq!(NodeKind::Custom("fix".to_string()).encode(), "Custom:fix");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form back into a NodeKind.
    ///
    /// Provides forward compatibility by falling back to `Custom(s)` for
    /// any unrecognized format.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use taskloom::types::NodeKind;
    /// assert_eq!(NodeKind::decode("Start"), NodeKind::Start);
    /// assert_eq!(NodeKind::decode("Custom:fix"), NodeKind::Custom("fix".to_string()));
    /// ```
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the virtual [`Start`](Self::Start) marker.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) marker.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` if this is an application node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

// Developer Experience: allow using string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

/// Lifecycle state of a single task traversal.
///
/// Transitions follow a fixed machine:
///
/// ```text
/// Pending → Running → {WaitingHuman ⇄ Running} → {Completed | Failed | NeedsReview}
/// ```
///
/// `Pending` is the state of a task for which no checkpoint exists yet.
/// The three terminal states never transition further; resuming a terminal
/// task returns its stored state without executing any node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Created but not yet executed; no checkpoint has been written.
    Pending,
    /// A node is executing or routing is in progress.
    Running,
    /// Suspended at a human gate, awaiting an external decision.
    WaitingHuman,
    /// Traversal reached End successfully.
    Completed,
    /// A node failed or the task was cancelled.
    Failed,
    /// Escalated for manual review (e.g. retries exhausted).
    NeedsReview,
}

impl TaskStatus {
    /// Returns `true` for the three terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::NeedsReview)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::WaitingHuman => "WAITING_HUMAN",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::NeedsReview => "NEEDS_REVIEW",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_encode_decode_round_trip() {
        for kind in [
            NodeKind::Start,
            NodeKind::End,
            NodeKind::Custom("validate".into()),
        ] {
            assert_eq!(NodeKind::decode(&kind.encode()), kind);
        }
    }

    #[test]
    fn node_kind_decode_unknown_is_custom() {
        assert_eq!(
            NodeKind::decode("Mystery"),
            NodeKind::Custom("Mystery".to_string())
        );
    }

    #[test]
    fn status_terminality() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::WaitingHuman.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::NeedsReview.is_terminal());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&TaskStatus::WaitingHuman).unwrap();
        assert_eq!(json, "\"WAITING_HUMAN\"");
        let back: TaskStatus = serde_json::from_str("\"NEEDS_REVIEW\"").unwrap();
        assert_eq!(back, TaskStatus::NeedsReview);
    }
}
