//! Runtime layer: the executor, checkpoint persistence, and configuration.
//!
//! Module map:
//! - [`executor`]: the [`TaskExecutor`] state machine that walks a compiled
//!   workflow one node at a time.
//! - [`checkpointer`]: the [`Checkpointer`] trait plus the in-memory backend.
//! - [`checkpointer_sqlite`]: durable SQLite backend (behind the `sqlite`
//!   feature).
//! - [`persistence`]: serde-facing persisted shapes and conversions.
//! - [`config`]: [`RuntimeConfig`] describing how an executor is built.

pub mod checkpointer;
#[cfg(feature = "sqlite")]
pub mod checkpointer_sqlite;
pub mod config;
pub mod executor;
pub mod persistence;

pub use checkpointer::{
    Checkpoint, Checkpointer, CheckpointerError, CheckpointerType, InMemoryCheckpointer,
};
#[cfg(feature = "sqlite")]
pub use checkpointer_sqlite::SQLiteCheckpointer;
pub use config::RuntimeConfig;
pub use executor::{ExecutorError, TaskExecutor};
pub use persistence::{PersistedCheckpoint, PersistedState, PersistenceError};
