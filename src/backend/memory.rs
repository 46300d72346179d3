//! Client-resident store.
//!
//! Keeps everything in memory behind a `Mutex` and, when opened with a path,
//! rewrites a JSON snapshot after every mutation. The snapshot is written
//! before the in-memory state is replaced, so a failed write leaves both
//! unchanged.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Backend, BackendError, TaskWrite};
use crate::progress::ProgressRecord;
use crate::task::{OwnerId, Task, TaskId};

/// Persisted snapshot layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default = "default_state_version")]
    version: u8,
    #[serde(default)]
    tasks: BTreeMap<OwnerId, Vec<Task>>,
    #[serde(default)]
    progress: BTreeMap<OwnerId, ProgressRecord>,
}

fn default_state_version() -> u8 {
    1
}

/// In-memory backend with optional JSON persistence.
pub struct LocalBackend {
    state: Mutex<LocalState>,
    snapshot_path: Option<PathBuf>,
    online: AtomicBool,
}

impl LocalBackend {
    /// A purely in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LocalState {
                version: default_state_version(),
                ..LocalState::default()
            }),
            snapshot_path: None,
            online: AtomicBool::new(true),
        }
    }

    /// Open a store backed by the snapshot at `path`, loading it if present.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] when the file exists but cannot be read and
    /// [`BackendError::Corrupt`] when it cannot be parsed.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let state = load_state(path)?;
        debug!(path = %path.display(), owners = state.progress.len(), "opened local store");
        Ok(Self {
            state: Mutex::new(state),
            snapshot_path: Some(path.to_path_buf()),
            online: AtomicBool::new(true),
        })
    }

    /// Simulate losing (or regaining) connectivity to this store.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(BackendError::Unavailable("local store is offline".to_owned()))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LocalState>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Lock(e.to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&LocalState) -> T) -> Result<T, BackendError> {
        self.check_online()?;
        let state = self.lock()?;
        Ok(f(&state))
    }

    /// Apply `f` to a copy of the state, persist it, then swap it in.
    fn write(&self, f: impl FnOnce(&mut LocalState)) -> Result<(), BackendError> {
        self.check_online()?;
        let mut state = self.lock()?;
        let mut next = state.clone();
        f(&mut next);
        if let Some(path) = &self.snapshot_path {
            save_state(path, &next)?;
        }
        *state = next;
        Ok(())
    }
}

impl Backend for LocalBackend {
    fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>, BackendError> {
        self.read(|state| state.tasks.get(owner).cloned().unwrap_or_default())
    }

    fn get_task(&self, owner: &OwnerId, id: &TaskId) -> Result<Option<Task>, BackendError> {
        self.read(|state| {
            state
                .tasks
                .get(owner)
                .and_then(|tasks| tasks.iter().find(|t| &t.id == id).cloned())
        })
    }

    fn replace_tasks(&self, owner: &OwnerId, tasks: &[Task]) -> Result<(), BackendError> {
        self.write(|state| {
            if tasks.is_empty() {
                state.tasks.remove(owner);
            } else {
                state.tasks.insert(owner.clone(), tasks.to_vec());
            }
        })
    }

    fn load_progress(&self, owner: &OwnerId) -> Result<Option<ProgressRecord>, BackendError> {
        self.read(|state| state.progress.get(owner).cloned())
    }

    fn save_progress(&self, record: &ProgressRecord) -> Result<(), BackendError> {
        self.write(|state| {
            state.progress.insert(record.owner_id.clone(), record.clone());
        })
    }

    fn commit(&self, write: TaskWrite<'_>, record: &ProgressRecord) -> Result<(), BackendError> {
        self.write(|state| {
            match write {
                TaskWrite::Put(task) => {
                    let tasks = state.tasks.entry(task.owner_id.clone()).or_default();
                    match tasks.iter_mut().find(|t| t.id == task.id) {
                        Some(existing) => *existing = task.clone(),
                        None => tasks.push(task.clone()),
                    }
                }
                TaskWrite::Remove(owner, id) => {
                    if let Some(tasks) = state.tasks.get_mut(owner) {
                        tasks.retain(|t| &t.id != id);
                        if tasks.is_empty() {
                            state.tasks.remove(owner);
                        }
                    }
                }
            }
            state.progress.insert(record.owner_id.clone(), record.clone());
        })
    }

    fn purge_owner(&self, owner: &OwnerId) -> Result<(), BackendError> {
        self.write(|state| {
            state.tasks.remove(owner);
            state.progress.remove(owner);
        })
    }
}

fn load_state(path: &Path) -> Result<LocalState, BackendError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LocalState {
                version: default_state_version(),
                ..LocalState::default()
            });
        }
        Err(e) => {
            return Err(BackendError::Io(format!(
                "cannot read local snapshot {}: {e}",
                path.display()
            )));
        }
    };

    serde_json::from_slice::<LocalState>(&bytes).map_err(|e| {
        warn!(path = %path.display(), error = %e, "malformed local snapshot");
        BackendError::Corrupt(format!("local snapshot {}: {e}", path.display()))
    })
}

fn save_state(path: &Path, state: &LocalState) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| BackendError::Io(format!("cannot create snapshot dir: {e}")))?;
    }

    let json = serde_json::to_string_pretty(state)
        .map_err(|e| BackendError::Serialize(format!("cannot serialize snapshot: {e}")))?;

    std::fs::write(path, json)
        .map_err(|e| BackendError::Io(format!("cannot write snapshot: {e}")))?;

    Ok(())
}
