//! Task Store Adapter: task CRUD against exactly one backend.
//!
//! Every mutating call also applies the matching delta to that backend's
//! progress record and writes both together. The adapter never reads or
//! writes the other backend; cross-backend work lives in [`crate::sync`].

use std::sync::Arc;

use tracing::debug;

use super::types::{NewTask, OwnerId, Task, TaskId, TaskPatch};
use crate::backend::{Backend, BackendError, BackendRole, TaskWrite};
use crate::error::{Result, TrackerError};
use crate::progress::{ProgressManager, ProgressRecord};

/// CRUD front for one backend.
#[derive(Clone)]
pub struct TaskStoreAdapter {
    role: BackendRole,
    backend: Arc<dyn Backend>,
    progress: ProgressManager,
}

impl TaskStoreAdapter {
    pub fn new(role: BackendRole, backend: Arc<dyn Backend>, progress: ProgressManager) -> Self {
        Self {
            role,
            backend,
            progress,
        }
    }

    #[must_use]
    pub fn role(&self) -> BackendRole {
        self.role
    }

    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressManager {
        &self.progress
    }

    /// Create a task. The title is validated before anything is written.
    ///
    /// # Errors
    ///
    /// [`TrackerError::InvalidArgument`] for a blank title, or
    /// [`TrackerError::BackendUnavailable`] when the backend fails.
    pub fn create(&self, owner: &OwnerId, title: &str) -> Result<(Task, ProgressRecord)> {
        let draft = NewTask::new(owner.clone(), title)?;
        self.insert(draft)
    }

    /// Persist an already validated draft.
    pub fn insert(&self, draft: NewTask) -> Result<(Task, ProgressRecord)> {
        let mut record = self.load_progress(&draft.owner_id)?;
        let task = draft.into_task(self.backend.assign_task_id(), self.progress.now());
        self.progress.record_creation(&mut record);
        self.backend
            .commit(TaskWrite::Put(&task), &record)
            .map_err(|e| self.lift(e))?;
        debug!(backend = %self.role, owner = %task.owner_id, task_id = %task.id, "task created");
        Ok((task, record))
    }

    pub fn list(&self, owner: &OwnerId) -> Result<Vec<Task>> {
        self.backend.list_tasks(owner).map_err(|e| self.lift(e))
    }

    /// One task by id.
    ///
    /// # Errors
    ///
    /// [`TrackerError::NotFound`] when the owner has no such task here.
    pub fn get(&self, owner: &OwnerId, id: &TaskId) -> Result<Task> {
        self.backend
            .get_task(owner, id)
            .map_err(|e| self.lift(e))?
            .ok_or_else(|| TrackerError::NotFound {
                task_id: id.to_string(),
            })
    }

    /// Patch a task and apply the completed-flag delta to the progress record.
    ///
    /// A patch that changes nothing performs no task write.
    pub fn update(
        &self,
        owner: &OwnerId,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<(Task, ProgressRecord)> {
        let mut task = self.get(owner, id)?;
        let mut record = self.load_progress(owner)?;

        let was_completed = task.completed;
        if !task.apply(patch, self.progress.now())? {
            return Ok((task, record));
        }

        self.progress
            .record_transition(&mut record, was_completed, task.completed);
        self.backend
            .commit(TaskWrite::Put(&task), &record)
            .map_err(|e| self.lift(e))?;
        debug!(
            backend = %self.role,
            %owner,
            task_id = %id,
            completed = task.completed,
            "task updated"
        );
        Ok((task, record))
    }

    /// Delete a task, returning it as it was just before removal.
    pub fn delete(&self, owner: &OwnerId, id: &TaskId) -> Result<(Task, ProgressRecord)> {
        let task = self.get(owner, id)?;
        let mut record = self.load_progress(owner)?;
        self.progress.record_deletion(&mut record, task.completed);
        self.backend
            .commit(TaskWrite::Remove(owner, id), &record)
            .map_err(|e| self.lift(e))?;
        debug!(backend = %self.role, %owner, task_id = %id, "task deleted");
        Ok((task, record))
    }

    /// Load (creating or resetting as needed) this backend's progress record.
    pub fn load_progress(&self, owner: &OwnerId) -> Result<ProgressRecord> {
        self.progress
            .load(self.backend.as_ref(), owner)
            .map_err(|e| self.lift(e))
    }

    pub fn save_progress(&self, record: &ProgressRecord) -> Result<()> {
        self.backend
            .save_progress(record)
            .map_err(|e| self.lift(e))
    }

    pub fn purge(&self, owner: &OwnerId) -> Result<()> {
        self.backend.purge_owner(owner).map_err(|e| self.lift(e))
    }

    fn lift(&self, err: BackendError) -> TrackerError {
        err.into_tracker(self.role)
    }
}
