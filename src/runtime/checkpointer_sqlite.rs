/*!
SQLite Checkpointer

This module provides the `SQLiteCheckpointer` async implementation of the
`Checkpointer` trait defined in `runtime/checkpointer.rs`.

## Behavior

- Uses serde-based persistence models (see `runtime::persistence`) for
  encoding `TaskState`, node kinds, and route hints.
- Keeps the full checkpoint history: one row per `(task_id, sequence)`.
- Enforces strictly increasing sequence numbers per task inside a single
  transaction, so concurrent writers on the same task id serialize through
  the store (`CheckpointerError::StaleSequence`).
- The schema is created idempotently on connect with
  `CREATE TABLE IF NOT EXISTS`.

## Database Schema

- `tasks.id` ← `checkpoint.task_id`
- `tasks.last_sequence` ← highest saved sequence for the task
- `checkpoints.task_id` / `checkpoints.sequence` ← history key
- `checkpoints.node` ← `NodeKind::encode()` of the last executed node
- `checkpoints.state_json` ← serialized `PersistedState`
- `checkpoints.route_hint` ← encoded routing override, nullable
- `checkpoints.saved_at` ← RFC3339 save time
*/

use std::sync::Arc;

use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::runtime::checkpointer::{Checkpoint, Checkpointer, CheckpointerError, Result};
use crate::runtime::persistence::{PersistedCheckpoint, PersistedState};
use crate::state::TaskState;
use crate::types::NodeKind;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id            TEXT PRIMARY KEY,
    last_sequence INTEGER NOT NULL DEFAULT 0,
    updated_at    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS checkpoints (
    task_id    TEXT NOT NULL REFERENCES tasks(id),
    sequence   INTEGER NOT NULL,
    node       TEXT NOT NULL,
    state_json TEXT NOT NULL,
    route_hint TEXT,
    saved_at   TEXT NOT NULL,
    PRIMARY KEY (task_id, sequence)
);
"#;

/// SQLite-backed checkpointer with full sequence history.
///
/// # Storage Growth
///
/// This backend stores every checkpoint. Storage grows roughly with
/// `(tasks × checkpoints_per_task × state_size)`; plan periodic cleanup of
/// completed tasks for long-running deployments (the `saved_at` and
/// `updated_at` columns support time-based policies).
pub struct SQLiteCheckpointer {
    /// Shared SQLite connection pool for concurrent checkpoint operations.
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SQLiteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SQLiteCheckpointer").finish()
    }
}

impl SQLiteCheckpointer {
    /// Connect to a SQLite database at `database_url` and ensure the
    /// schema exists. Example URL: `"sqlite://taskloom.db"`.
    #[must_use = "checkpointer must be used to persist state"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> std::result::Result<Self, CheckpointerError> {
        let pool =
            SqlitePool::connect(database_url)
                .await
                .map_err(|e| CheckpointerError::Backend {
                    message: format!("connect error: {e}"),
                })?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("schema init: {e}"),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn row_to_checkpoint(task_id: &str, row: &sqlx::sqlite::SqliteRow) -> Result<Checkpoint> {
        let sequence: i64 = row.get("sequence");
        let node: String = row.get("node");
        let state_json: String = row.get("state_json");
        let route_hint: Option<String> = row.get("route_hint");
        let saved_at: String = row.get("saved_at");

        let persisted = PersistedCheckpoint {
            task_id: task_id.to_string(),
            node,
            sequence: sequence as u64,
            state: PersistedState::from_json_str(&state_json).map_err(|e| {
                CheckpointerError::Serde {
                    message: format!("state decode: {e}"),
                }
            })?,
            route_hint,
            saved_at,
        };

        Checkpoint::try_from(persisted).map_err(|e| CheckpointerError::Serde {
            message: format!("checkpoint convert: {e}"),
        })
    }
}

#[async_trait::async_trait]
impl Checkpointer for SQLiteCheckpointer {
    #[instrument(skip(self, checkpoint), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let state_json = PersistedState::from(&checkpoint.state)
            .to_json_string()
            .map_err(|e| CheckpointerError::Serde {
                message: format!("state encode: {e}"),
            })?;
        let node_enc = checkpoint.node.encode();
        let route_hint_enc = checkpoint.route_hint.as_ref().map(NodeKind::encode);
        let saved_at = checkpoint.saved_at.to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("tx begin: {e}"),
            })?;

        // Sequence check inside the transaction: this is the per-task
        // compare-and-swap that serializes concurrent writers.
        let stored: Option<i64> =
            sqlx::query_scalar("SELECT last_sequence FROM tasks WHERE id = ?1")
                .bind(&checkpoint.task_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| CheckpointerError::Backend {
                    message: format!("sequence check: {e}"),
                })?;

        if let Some(stored) = stored {
            if stored >= checkpoint.sequence as i64 {
                return Err(CheckpointerError::StaleSequence {
                    task_id: checkpoint.task_id.clone(),
                    stored: stored as u64,
                    attempted: checkpoint.sequence,
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO tasks (id, last_sequence, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET last_sequence = ?2, updated_at = ?3
        "#,
        )
        .bind(&checkpoint.task_id)
        .bind(checkpoint.sequence as i64)
        .bind(&saved_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("upsert task: {e}"),
        })?;

        sqlx::query(
            r#"
            INSERT INTO checkpoints (task_id, sequence, node, state_json, route_hint, saved_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        )
        .bind(&checkpoint.task_id)
        .bind(checkpoint.sequence as i64)
        .bind(&node_enc)
        .bind(&state_json)
        .bind(&route_hint_enc)
        .bind(&saved_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("insert checkpoint: {e}"),
        })?;

        tx.commit().await.map_err(|e| CheckpointerError::Backend {
            message: format!("tx commit: {e}"),
        })?;

        Ok(())
    }

    #[instrument(skip(self, task_id), err)]
    async fn load_latest(&self, task_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            r#"
            SELECT sequence, node, state_json, route_hint, saved_at
            FROM checkpoints
            WHERE task_id = ?1
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("select latest: {e}"),
        })?;

        match row {
            Some(row) => Ok(Some(Self::row_to_checkpoint(task_id, &row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    async fn list_tasks(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM tasks
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("list tasks: {e}"),
        })?;

        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}

// Extended SQLiteCheckpointer methods (not part of the base trait)
impl SQLiteCheckpointer {
    /// Load the full checkpoint history for a task, oldest first.
    ///
    /// `load_latest` is all the executor needs; history access exists for
    /// inspection and debugging tools.
    #[instrument(skip(self), err)]
    pub async fn load_history(&self, task_id: &str) -> Result<Vec<Checkpoint>> {
        let rows = sqlx::query(
            r#"
            SELECT sequence, node, state_json, route_hint, saved_at
            FROM checkpoints
            WHERE task_id = ?1
            ORDER BY sequence ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("select history: {e}"),
        })?;

        let mut checkpoints = Vec::with_capacity(rows.len());
        for row in &rows {
            checkpoints.push(Self::row_to_checkpoint(task_id, row)?);
        }
        Ok(checkpoints)
    }

    /// Current state snapshot for a task, decoded from the latest
    /// checkpoint, if one exists.
    pub async fn load_latest_state(&self, task_id: &str) -> Result<Option<TaskState>> {
        Ok(self.load_latest(task_id).await?.map(|cp| cp.state))
    }
}
