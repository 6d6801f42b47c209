/*!
Persistence primitives for serializing/deserializing task state and
checkpoints (used by the SQLite checkpointer and any future persistent
backends).

Design Goals:
- Provide explicit serde-friendly structs decoupled from internal
  in-memory representations.
- Keep conversion logic localized (From / TryFrom impls) so the
  checkpointer code is lean and declarative.
- Allow forward compatibility (unknown NodeKind encodings round-trip
  as `NodeKind::Custom(encoded_string)`).

This module intentionally does NOT perform I/O. It is pure data
transformation and (de)serialization glue.
*/

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::message::Message;
use crate::runtime::checkpointer::Checkpoint;
use crate::state::{ErrorInfo, TaskState};
use crate::types::{NodeKind, TaskStatus};

/// Persisted shape of a [`TaskState`].
///
/// Timestamps are stored as RFC3339 strings to keep `chrono::DateTime` out
/// of the serialized shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub extra: FxHashMap<String, Value>,
    pub started_at: String,
}

/// Full persisted checkpoint representation.
/// (Step history tables store one instance of this shape per sequence.)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCheckpoint {
    pub task_id: String,
    /// Last executed node, encoded with `NodeKind::encode()`.
    pub node: String,
    pub sequence: u64,
    pub state: PersistedState,
    /// Routing-node successor override, encoded with `NodeKind::encode()`.
    #[serde(default)]
    pub route_hint: Option<String>,
    /// RFC3339 string form of the save time.
    pub saved_at: String,
}

/// Bidirectional conversion and serialization errors for persistence models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("missing field: {0}")]
    #[diagnostic(
        code(taskloom::persistence::missing_field),
        help("Populate the field in the persisted JSON before conversion.")
    )]
    MissingField(&'static str),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(taskloom::persistence::serde),
        help("Ensure the JSON structure matches Persisted* types.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timestamp in field {field}: {value}")]
    #[diagnostic(
        code(taskloom::persistence::timestamp),
        help("Timestamps must be RFC3339 strings.")
    )]
    Timestamp { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

fn parse_rfc3339(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| PersistenceError::Timestamp {
            field,
            value: value.to_string(),
        })
}

/* ---------- TaskState <-> PersistedState Conversions ---------- */

impl From<&TaskState> for PersistedState {
    fn from(s: &TaskState) -> Self {
        PersistedState {
            task_id: s.task_id.clone(),
            status: s.status,
            error: s.error.clone(),
            messages: s.messages.clone(),
            result: s.result.clone(),
            extra: s.extra.clone(),
            started_at: s.started_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedState> for TaskState {
    type Error = PersistenceError;

    fn try_from(p: PersistedState) -> Result<Self> {
        let started_at = parse_rfc3339("started_at", &p.started_at)?;
        Ok(TaskState {
            task_id: p.task_id,
            status: p.status,
            error: p.error,
            messages: p.messages,
            result: p.result,
            extra: p.extra,
            started_at,
        })
    }
}

/* ---------- Checkpoint <-> PersistedCheckpoint Conversions ---------- */

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        PersistedCheckpoint {
            task_id: cp.task_id.clone(),
            node: cp.node.encode(),
            sequence: cp.sequence,
            state: PersistedState::from(&cp.state),
            route_hint: cp.route_hint.as_ref().map(NodeKind::encode),
            saved_at: cp.saved_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = PersistenceError;

    fn try_from(p: PersistedCheckpoint) -> Result<Self> {
        let state = TaskState::try_from(p.state)?;
        let saved_at = parse_rfc3339("saved_at", &p.saved_at)?;
        Ok(Checkpoint {
            task_id: p.task_id,
            node: NodeKind::decode(&p.node),
            sequence: p.sequence,
            state,
            route_hint: p.route_hint.as_deref().map(NodeKind::decode),
            saved_at,
        })
    }
}

/* ---------- Convenience JSON helpers ---------- */

impl PersistedState {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PersistenceError::Serde { source: e })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PersistenceError::Serde { source: e })
    }
}

impl PersistedCheckpoint {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PersistenceError::Serde { source: e })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PersistenceError::Serde { source: e })
    }
}
