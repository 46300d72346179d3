//! Task entities and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TrackerError};

/// Opaque owner identifier supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap a raw owner id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Backend-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wrap an existing id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub owner_id: OwnerId,
    pub title: String,
    pub completed: bool,
    /// Bumped on every change; breaks `updated_at` ties during reconciliation.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Apply a patch in place. Returns `true` when anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidArgument`] for a blank replacement title;
    /// the task is left untouched in that case.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) -> Result<bool> {
        let title = match patch.title.as_deref() {
            Some(raw) => Some(normalize_title(raw)?),
            None => None,
        };

        let mut changed = false;
        if let Some(title) = title
            && title != self.title
        {
            self.title = title;
            changed = true;
        }
        if let Some(completed) = patch.completed
            && completed != self.completed
        {
            self.completed = completed;
            changed = true;
        }

        if changed {
            self.revision = self.revision.saturating_add(1);
            self.updated_at = now;
        }
        Ok(changed)
    }
}

/// A task whose id has not been assigned by a backend yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub owner_id: OwnerId,
    pub title: String,
}

impl NewTask {
    /// Validate and build a draft.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidArgument`] when the title is empty after trimming.
    pub fn new(owner_id: OwnerId, title: &str) -> Result<Self> {
        Ok(Self {
            owner_id,
            title: normalize_title(title)?,
        })
    }

    /// Materialize with a backend-assigned id.
    #[must_use]
    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Task {
        Task {
            id,
            owner_id: self.owner_id,
            title: self.title,
            completed: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub completed: Option<bool>,
    pub title: Option<String>,
}

impl TaskPatch {
    /// Patch that only flips the completed flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            title: None,
        }
    }

    /// Reject a blank replacement title.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidArgument`] when `title` is set but empty
    /// after trimming.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = self.title.as_deref() {
            normalize_title(title)?;
        }
        Ok(())
    }
}

fn normalize_title(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidArgument(
            "task title cannot be empty".to_owned(),
        ));
    }
    Ok(trimmed.to_owned())
}
