//! Per-owner aggregate progress record and the views derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::milestone::{Milestone, Mood};
use crate::task::{OwnerId, Task};

/// Stored aggregate counters for one owner in one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub owner_id: OwnerId,
    /// Completions within the current daily cycle.
    pub completed_tasks: u64,
    /// Live tasks.
    pub total_tasks: u64,
    /// Lifetime completions currently counted; drives the milestone ladder.
    pub all_time_completed: u64,
    pub mood: Mood,
    pub daily_completed_tasks: u64,
    pub daily_mood_checks: u64,
    #[serde(rename = "dailyAISplits")]
    pub daily_ai_splits: u64,
    pub last_reset_date: DateTime<Utc>,
    /// Bumped on every save; reconciliation prefers the higher version.
    #[serde(default)]
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Fresh record for an owner seen for the first time.
    #[must_use]
    pub fn new(owner_id: OwnerId, mood: Mood, now: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            completed_tasks: 0,
            total_tasks: 0,
            all_time_completed: 0,
            mood,
            daily_completed_tasks: 0,
            daily_mood_checks: 0,
            daily_ai_splits: 0,
            last_reset_date: now,
            version: 0,
            updated_at: now,
        }
    }

    /// Apply the counter deltas for one task's completed-flag transition and
    /// return the counters afterwards.
    ///
    /// Completing adds one to each cycle/lifetime counter; uncompleting takes
    /// exactly that back, clamped at zero. Any other combination is a no-op.
    pub fn apply_task_transition(
        &mut self,
        was_completed: bool,
        is_completed: bool,
    ) -> CycleCounters {
        match (was_completed, is_completed) {
            (false, true) => {
                self.completed_tasks = self.completed_tasks.saturating_add(1);
                self.all_time_completed = self.all_time_completed.saturating_add(1);
                self.daily_completed_tasks = self.daily_completed_tasks.saturating_add(1);
            }
            (true, false) => {
                self.completed_tasks = self.completed_tasks.saturating_sub(1);
                self.all_time_completed = self.all_time_completed.saturating_sub(1);
                self.daily_completed_tasks = self.daily_completed_tasks.saturating_sub(1);
            }
            _ => {}
        }
        self.counters()
    }

    /// Current counter values.
    #[must_use]
    pub fn counters(&self) -> CycleCounters {
        CycleCounters {
            completed_tasks: self.completed_tasks,
            all_time_completed: self.all_time_completed,
            daily_completed_tasks: self.daily_completed_tasks,
            daily_mood_checks: self.daily_mood_checks,
        }
    }

    /// Mark the record as modified.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version = self.version.saturating_add(1);
        self.updated_at = now;
    }
}

/// Counters returned by a transition; input to mood resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleCounters {
    pub completed_tasks: u64,
    pub all_time_completed: u64,
    pub daily_completed_tasks: u64,
    pub daily_mood_checks: u64,
}

/// Read model returned by `get_progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub completed_tasks: u64,
    pub total_tasks: u64,
    pub all_time_completed: u64,
    pub mood: Mood,
    pub display_completed: u64,
    pub max_value: u64,
    pub current_milestone: usize,
    pub daily_completed_tasks: u64,
    pub daily_mood_checks: u64,
    #[serde(rename = "dailyAISplits")]
    pub daily_ai_splits: u64,
    pub last_reset_date: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Combine a stored record with its freshly derived milestone.
    #[must_use]
    pub fn from_record(record: &ProgressRecord, milestone: &Milestone) -> Self {
        Self {
            completed_tasks: record.completed_tasks,
            total_tasks: record.total_tasks,
            all_time_completed: record.all_time_completed,
            mood: record.mood.clone(),
            display_completed: milestone.display_completed(record.all_time_completed),
            max_value: milestone.max_value,
            current_milestone: milestone.index,
            daily_completed_tasks: record.daily_completed_tasks,
            daily_mood_checks: record.daily_mood_checks,
            daily_ai_splits: record.daily_ai_splits,
            last_reset_date: record.last_reset_date,
        }
    }
}

/// Result of `update_task` / `delete_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChange {
    pub task: Task,
    pub completed_tasks: u64,
    pub new_mood: Mood,
    pub display_completed: u64,
    pub max_value: u64,
    pub all_time_completed: u64,
    pub current_milestone: usize,
}

impl TaskChange {
    #[must_use]
    pub fn new(task: Task, record: &ProgressRecord, milestone: &Milestone) -> Self {
        Self {
            task,
            completed_tasks: record.completed_tasks,
            new_mood: record.mood.clone(),
            display_completed: milestone.display_completed(record.all_time_completed),
            max_value: milestone.max_value,
            all_time_completed: record.all_time_completed,
            current_milestone: milestone.index,
        }
    }
}
