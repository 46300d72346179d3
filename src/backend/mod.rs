//! Storage contract shared by the client-resident and server-resident stores.
//!
//! A backend stores tasks and one progress record per owner. It performs no
//! cross-backend I/O; reconciliation lives in [`crate::sync`].
//!
//! Active implementations:
//! - `memory`: [`LocalBackend`], in-memory with an optional JSON snapshot file.
//! - `sqlite`: [`SqliteBackend`], a single SQLite database file.

pub mod memory;
pub(crate) mod schema;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::progress::ProgressRecord;
use crate::task::{OwnerId, Task, TaskId};

pub use memory::LocalBackend;
pub use sqlite::SqliteBackend;

/// Which side of the sync a backend sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRole {
    /// Client-resident store.
    Local,
    /// Server-resident store.
    Remote,
}

impl BackendRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task half of an atomic backend write.
#[derive(Debug, Clone, Copy)]
pub enum TaskWrite<'a> {
    /// Insert or overwrite this task.
    Put(&'a Task),
    /// Remove the task with this id if present.
    Remove(&'a OwnerId, &'a TaskId),
}

/// Storage contract every backend satisfies.
///
/// Implementations must be safe to share across threads. Any returned
/// [`BackendError`] is treated by callers as "backend unreachable".
pub trait Backend: Send + Sync {
    /// Assign an id to a task that is about to be inserted.
    fn assign_task_id(&self) -> TaskId {
        TaskId::generate()
    }

    /// All tasks for an owner, oldest first.
    fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, BackendError>;

    /// One task, or `None` when the owner has no task with that id.
    fn get_task(&self, owner: &OwnerId, id: &TaskId) -> Result<Option<Task>, BackendError>;

    /// Replace the owner's whole task list.
    fn replace_tasks(&self, owner: &OwnerId, tasks: &[Task]) -> Result<(), BackendError>;

    /// The owner's progress record, if one exists.
    fn load_progress(&self, owner: &OwnerId) -> Result<Option<ProgressRecord>, BackendError>;

    /// Insert or overwrite the owner's progress record.
    fn save_progress(&self, record: &ProgressRecord) -> Result<(), BackendError>;

    /// Write a task change and the matching progress record together.
    fn commit(&self, write: TaskWrite<'_>, record: &ProgressRecord) -> Result<(), BackendError>;

    /// Remove every task and the progress record for an owner.
    fn purge_owner(&self, owner: &OwnerId) -> Result<(), BackendError>;
}

/// Errors from a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend offline: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl BackendError {
    /// Lift into the crate error, tagged with the failing side.
    #[must_use]
    pub fn into_tracker(self, backend: BackendRole) -> crate::TrackerError {
        crate::TrackerError::BackendUnavailable {
            backend,
            reason: self.to_string(),
        }
    }
}
