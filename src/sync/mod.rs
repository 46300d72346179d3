//! Reconciliation between the client-resident and server-resident stores.

pub mod reconciler;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::backend::BackendRole;

pub use reconciler::Reconciler;

/// How divergent task lists and progress records are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Union tasks by id, last writer wins per task; higher record version wins.
    #[default]
    Merge,
    /// The longer non-empty task list wins; first progress record found wins.
    Count,
}

impl fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => f.write_str("merge"),
            Self::Count => f.write_str("count"),
        }
    }
}

/// A reconciled task list written to one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCopy {
    pub to: BackendRole,
    pub tasks: usize,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub policy: ReconcilePolicy,
    /// Backends that could not be read or written during the pass.
    pub unreachable: Vec<BackendRole>,
    pub task_copies: Vec<TaskCopy>,
    pub progress_copied_to: Vec<BackendRole>,
}

impl SyncReport {
    #[must_use]
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self {
            policy,
            unreachable: Vec::new(),
            task_copies: Vec::new(),
            progress_copied_to: Vec::new(),
        }
    }

    pub fn mark_unreachable(&mut self, role: BackendRole) {
        if !self.unreachable.contains(&role) {
            self.unreachable.push(role);
        }
    }

    /// True when at least one backend was skipped.
    #[must_use]
    pub fn degraded(&self) -> bool {
        !self.unreachable.is_empty()
    }
}
