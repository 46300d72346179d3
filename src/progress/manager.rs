//! Progress record manager.
//!
//! Owns the load/create/reset lifecycle of a record inside one backend and
//! the mutations driven by task transitions. Callers hold the owner lock for
//! the whole load -> mutate -> save sequence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::reset::apply_daily_reset;
use super::types::{CycleCounters, ProgressRecord, ProgressSnapshot, TaskChange};
use crate::backend::{Backend, BackendError};
use crate::clock::Clock;
use crate::milestone::{Milestone, MilestoneTable, Mood};
use crate::task::{OwnerId, Task};

/// Pick the mood to store after a transition.
///
/// An explicit mood check-in earlier in the same daily cycle wins over the
/// milestone-derived mood until the next reset.
#[must_use]
pub fn resolve_mood(counters: &CycleCounters, current: &Mood, milestone: &Milestone) -> Mood {
    if counters.daily_mood_checks == 0 {
        milestone.mood.clone()
    } else {
        current.clone()
    }
}

/// Shared progress logic, cheap to clone.
#[derive(Clone)]
pub struct ProgressManager {
    milestones: Arc<MilestoneTable>,
    clock: Arc<dyn Clock>,
}

impl ProgressManager {
    pub fn new(milestones: Arc<MilestoneTable>, clock: Arc<dyn Clock>) -> Self {
        Self { milestones, clock }
    }

    #[must_use]
    pub fn milestones(&self) -> &MilestoneTable {
        &self.milestones
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Derive the milestone for a record. Never cached.
    #[must_use]
    pub fn milestone(&self, record: &ProgressRecord) -> Milestone {
        self.milestones.milestone_for(record.all_time_completed)
    }

    /// Load the owner's record from `backend`, creating it on first access and
    /// running the daily reset. Persists whenever it created or reset.
    ///
    /// # Errors
    ///
    /// Propagates backend read/write failures.
    pub fn load(
        &self,
        backend: &dyn Backend,
        owner: &OwnerId,
    ) -> Result<ProgressRecord, BackendError> {
        let now = self.now();
        match backend.load_progress(owner)? {
            Some(mut record) => {
                if self.reset_if_due(&mut record, now) {
                    backend.save_progress(&record)?;
                }
                Ok(record)
            }
            None => {
                let mut record =
                    ProgressRecord::new(owner.clone(), self.milestones.initial_mood(), now);
                record.touch(now);
                backend.save_progress(&record)?;
                debug!(%owner, "created progress record");
                Ok(record)
            }
        }
    }

    /// Apply the daily reset to an in-memory record. Returns `true` if it fired.
    ///
    /// A reset also clears any mood override, so the milestone mood returns.
    pub fn reset_if_due(&self, record: &mut ProgressRecord, now: DateTime<Utc>) -> bool {
        if !apply_daily_reset(record, now) {
            return false;
        }
        let milestone = self.milestone(record);
        record.mood = resolve_mood(&record.counters(), &record.mood, &milestone);
        record.touch(now);
        info!(owner = %record.owner_id, "daily counters reset");
        true
    }

    /// Record a completed-flag transition and re-derive the mood.
    pub fn record_transition(
        &self,
        record: &mut ProgressRecord,
        was_completed: bool,
        is_completed: bool,
    ) {
        let counters = record.apply_task_transition(was_completed, is_completed);
        let milestone = self.milestone(record);
        record.mood = resolve_mood(&counters, &record.mood, &milestone);
        record.touch(self.now());
    }

    /// Record a new live task.
    pub fn record_creation(&self, record: &mut ProgressRecord) {
        record.total_tasks = record.total_tasks.saturating_add(1);
        record.touch(self.now());
    }

    /// Record a deleted task. A completed task also gives back its completion.
    pub fn record_deletion(&self, record: &mut ProgressRecord, was_completed: bool) {
        let counters = record.apply_task_transition(was_completed, false);
        record.total_tasks = record.total_tasks.saturating_sub(1);
        let milestone = self.milestone(record);
        record.mood = resolve_mood(&counters, &record.mood, &milestone);
        record.touch(self.now());
    }

    /// Store an explicitly chosen mood.
    pub fn set_mood(&self, record: &mut ProgressRecord, mood: Mood) {
        record.mood = mood;
        record.touch(self.now());
    }

    #[must_use]
    pub fn snapshot(&self, record: &ProgressRecord) -> ProgressSnapshot {
        ProgressSnapshot::from_record(record, &self.milestone(record))
    }

    #[must_use]
    pub fn task_change(&self, task: Task, record: &ProgressRecord) -> TaskChange {
        TaskChange::new(task, record, &self.milestone(record))
    }
}
