//! Runtime configuration for task execution.

use chrono::Duration;

use crate::utils::id_generator;

use super::CheckpointerType;

/// Configuration a [`TaskExecutor`](crate::runtime::TaskExecutor) is built
/// from.
///
/// `task_id` is the default id used by task wrappers when callers do not
/// supply one; `budget` bounds the wall-clock time of a traversal measured
/// from the state's `started_at`.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub task_id: Option<String>,
    pub checkpointer: Option<CheckpointerType>,
    pub sqlite_db_name: Option<String>,
    pub budget: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            task_id: Some(id_generator::IdGenerator::new().generate_task_id()),
            checkpointer: Some(CheckpointerType::InMemory),
            sqlite_db_name: Self::resolve_sqlite_db_name(None),
            budget: None,
        }
    }
}

impl RuntimeConfig {
    fn resolve_sqlite_db_name(provided: Option<String>) -> Option<String> {
        if let Some(name) = provided {
            return Some(name);
        }
        dotenvy::dotenv().ok();
        Some(std::env::var("SQLITE_DB_NAME").unwrap_or_else(|_| "taskloom.db".to_string()))
    }

    pub fn new(
        task_id: Option<String>,
        checkpointer: Option<CheckpointerType>,
        sqlite_db_name: Option<String>,
    ) -> Self {
        Self {
            task_id,
            checkpointer,
            sqlite_db_name: Self::resolve_sqlite_db_name(sqlite_db_name),
            budget: None,
        }
    }

    /// Bound each traversal to the given wall-clock budget.
    ///
    /// The executor checks the budget before every node execution and fails
    /// the task once it is exceeded.
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }
}
