//! Synchronization Reconciler.
//!
//! Runs inside the caller's request, under the owner lock. Adapters are passed
//! in priority order; the first one is the primary and wins every tie.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::{ReconcilePolicy, SyncReport, TaskCopy};
use crate::error::{Result, TrackerError};
use crate::progress::{ProgressManager, ProgressRecord};
use crate::task::{OwnerId, Task, TaskId, TaskStoreAdapter};

/// Resolves divergence between the adapters' task lists and progress records.
#[derive(Clone)]
pub struct Reconciler {
    policy: ReconcilePolicy,
    progress: ProgressManager,
}

/// One adapter's readable state.
struct Side<'a, T> {
    adapter: &'a TaskStoreAdapter,
    value: T,
}

impl Reconciler {
    pub fn new(policy: ReconcilePolicy, progress: ProgressManager) -> Self {
        Self { policy, progress }
    }

    #[must_use]
    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Bring the task lists into agreement and return the agreed list.
    ///
    /// # Errors
    ///
    /// [`TrackerError::Unavailable`] when no adapter could be read.
    pub fn reconcile_tasks(
        &self,
        owner: &OwnerId,
        adapters: &[&TaskStoreAdapter],
        report: &mut SyncReport,
    ) -> Result<Vec<Task>> {
        let sides = read_all(owner, adapters, report, |a| a.list(owner))?;
        if sides.len() == 1 {
            return Ok(sides.into_iter().map(|s| s.value).next().unwrap_or_default());
        }

        let agreed = match self.policy {
            ReconcilePolicy::Count => count_winner(&sides),
            ReconcilePolicy::Merge => merge_by_id(&sides),
        };

        for side in &sides {
            let needs_copy = match self.policy {
                ReconcilePolicy::Count => agreed.as_ref().is_some_and(|w| *w != side.value),
                ReconcilePolicy::Merge => {
                    agreed.as_ref().is_some_and(|w| !same_tasks(w, &side.value))
                }
            };
            if !needs_copy {
                continue;
            }
            let Some(tasks) = agreed.as_ref() else {
                continue;
            };
            let role = side.adapter.role();
            match side.adapter.backend().replace_tasks(owner, tasks) {
                Ok(()) => {
                    info!(%owner, backend = %role, tasks = tasks.len(), policy = %self.policy, "task list copied");
                    report.task_copies.push(TaskCopy {
                        to: role,
                        tasks: tasks.len(),
                    });
                }
                Err(e) => {
                    warn!(%owner, backend = %role, error = %e, "could not write reconciled tasks");
                    report.mark_unreachable(role);
                }
            }
        }

        // Equal-length lists under the count policy are left as they are; the
        // caller sees the primary's view.
        Ok(agreed.unwrap_or_else(|| {
            sides
                .into_iter()
                .map(|s| s.value)
                .next()
                .unwrap_or_default()
        }))
    }

    /// Bring the progress records into agreement and return the record the
    /// caller should act on. Creates the record on first access and runs the
    /// daily reset.
    ///
    /// # Errors
    ///
    /// [`TrackerError::Unavailable`] when no adapter could be read.
    pub fn reconcile_progress(
        &self,
        owner: &OwnerId,
        adapters: &[&TaskStoreAdapter],
        report: &mut SyncReport,
    ) -> Result<ProgressRecord> {
        let sides = read_all(owner, adapters, report, |a| {
            a.backend()
                .load_progress(owner)
                .map_err(|e| e.into_tracker(a.role()))
        })?;
        let now = self.progress.now();

        let winner = match self.policy {
            ReconcilePolicy::Count => sides.iter().find_map(|s| s.value.clone()),
            ReconcilePolicy::Merge => sides
                .iter()
                .filter_map(|s| s.value.as_ref())
                .fold(None::<&ProgressRecord>, |best, r| match best {
                    Some(b) if b.version >= r.version => Some(b),
                    _ => Some(r),
                })
                .cloned(),
        };

        let mut agreed = winner.unwrap_or_else(|| {
            let mut fresh =
                ProgressRecord::new(owner.clone(), self.progress.milestones().initial_mood(), now);
            fresh.touch(now);
            fresh
        });
        self.progress.reset_if_due(&mut agreed, now);

        for side in &sides {
            let role = side.adapter.role();
            let target = match (&side.value, self.policy) {
                (None, _) => Some(agreed.clone()),
                (Some(existing), ReconcilePolicy::Merge) => {
                    (*existing != agreed).then(|| agreed.clone())
                }
                // No merge across existing records, only the local daily reset.
                (Some(existing), ReconcilePolicy::Count) => {
                    let mut own = existing.clone();
                    self.progress.reset_if_due(&mut own, now).then_some(own)
                }
            };
            let Some(record) = target else {
                continue;
            };
            match side.adapter.backend().save_progress(&record) {
                Ok(()) => {
                    if side.value.is_none() || self.policy == ReconcilePolicy::Merge {
                        info!(%owner, backend = %role, version = record.version, "progress record copied");
                        report.progress_copied_to.push(role);
                    }
                }
                Err(e) => {
                    warn!(%owner, backend = %role, error = %e, "could not write reconciled progress");
                    report.mark_unreachable(role);
                }
            }
        }

        Ok(agreed)
    }
}

/// Read every adapter, degrading to the readable subset.
fn read_all<'a, T>(
    owner: &OwnerId,
    adapters: &[&'a TaskStoreAdapter],
    report: &mut SyncReport,
    read: impl Fn(&TaskStoreAdapter) -> Result<T>,
) -> Result<Vec<Side<'a, T>>> {
    let mut sides = Vec::with_capacity(adapters.len());
    for &adapter in adapters {
        match read(adapter) {
            Ok(value) => sides.push(Side { adapter, value }),
            Err(e) => {
                warn!(%owner, backend = %adapter.role(), error = %e, "backend unreachable, continuing in degraded mode");
                report.mark_unreachable(adapter.role());
            }
        }
    }
    if sides.is_empty() {
        return Err(TrackerError::Unavailable);
    }
    Ok(sides)
}

/// Count policy: empty means never synced, a strictly longer list is newer,
/// equal lengths mean already in sync (`None`).
fn count_winner(sides: &[Side<'_, Vec<Task>>]) -> Option<Vec<Task>> {
    let longest = sides.iter().map(|s| s.value.len()).max().unwrap_or(0);
    if longest == 0 {
        return None;
    }
    let holders = sides.iter().filter(|s| s.value.len() == longest).count();
    if holders == sides.len() {
        return None;
    }
    sides
        .iter()
        .find(|s| s.value.len() == longest)
        .map(|s| s.value.clone())
}

/// Merge policy: union by id; a task on both sides resolves by
/// (`updated_at`, `revision`), earlier sides winning ties.
fn merge_by_id(sides: &[Side<'_, Vec<Task>>]) -> Option<Vec<Task>> {
    let mut merged: BTreeMap<TaskId, Task> = BTreeMap::new();
    for side in sides {
        for task in &side.value {
            match merged.get(&task.id) {
                Some(current)
                    if (current.updated_at, current.revision)
                        >= (task.updated_at, task.revision) => {}
                _ => {
                    merged.insert(task.id.clone(), task.clone());
                }
            }
        }
    }
    let mut tasks: Vec<Task> = merged.into_values().collect();
    sort_tasks(&mut tasks);
    Some(tasks)
}

fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
}

/// Order-insensitive equality.
fn same_tasks(a: &[Task], b: &[Task]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    sort_tasks(&mut a);
    sort_tasks(&mut b);
    a == b
}
