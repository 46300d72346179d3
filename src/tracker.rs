//! Tracker facade: every externally visible operation.
//!
//! Each call takes the owner lock, reconciles the two stores, performs the
//! mutation on the first reachable store in priority order, and mirrors the
//! result into the other one. A failed mirror is logged and the request still
//! succeeds; the next reconciliation repairs the gap.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::backend::{Backend, BackendRole, LocalBackend, SqliteBackend, TaskWrite};
use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::locks::OwnerLocks;
use crate::milestone::Mood;
use crate::progress::{ProgressManager, ProgressRecord, ProgressSnapshot, TaskChange};
use crate::quota::{QuotaClass, QuotaLimiter, QuotaOutcome, StaticTiers, TierSource};
use crate::split::TaskSplitter;
use crate::sync::{Reconciler, SyncReport};
use crate::task::{OwnerId, Task, TaskId, TaskPatch, TaskStoreAdapter};

/// Result of [`Tracker::check_in_mood`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodCheckIn {
    pub quota: QuotaOutcome,
    /// The record after the call; unchanged when the quota was exhausted.
    pub record: ProgressRecord,
}

/// Result of [`Tracker::split_task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOutcome {
    pub quota: QuotaOutcome,
    /// Empty when the quota was exhausted.
    pub parts: Vec<String>,
}

/// What a successful write must replay on the other stores.
enum Effect {
    Nothing,
    Progress(ProgressRecord),
    Put(Task, ProgressRecord),
    Remove(Task, ProgressRecord),
}

struct Applied<T> {
    value: T,
    effect: Effect,
}

impl<T> Applied<T> {
    fn new(value: T, effect: Effect) -> Self {
        Self { value, effect }
    }
}

/// Progress tracking and dual-store sync engine.
pub struct Tracker {
    /// Priority order: primary first.
    adapters: Vec<TaskStoreAdapter>,
    reconciler: Reconciler,
    quotas: QuotaLimiter,
    progress: ProgressManager,
    locks: OwnerLocks,
}

impl Tracker {
    /// Build a tracker over two backends with the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] for an invalid configuration.
    pub fn new(
        config: &TrackerConfig,
        local: Arc<dyn Backend>,
        remote: Arc<dyn Backend>,
    ) -> Result<Self> {
        Self::with_clock(config, local, remote, Arc::new(SystemClock))
    }

    /// Build a tracker with an injected clock.
    pub fn with_clock(
        config: &TrackerConfig,
        local: Arc<dyn Backend>,
        remote: Arc<dyn Backend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let progress = ProgressManager::new(Arc::new(config.milestone_table()?), clock);

        let local = TaskStoreAdapter::new(BackendRole::Local, local, progress.clone());
        let remote = TaskStoreAdapter::new(BackendRole::Remote, remote, progress.clone());
        let adapters = match config.sync.primary {
            BackendRole::Remote => vec![remote, local],
            BackendRole::Local => vec![local, remote],
        };

        let tiers = StaticTiers::new(config.quotas.premium_owners.iter().cloned());
        info!(
            policy = %config.sync.policy,
            primary = %config.sync.primary,
            milestones = config.milestones.len(),
            "tracker ready"
        );

        Ok(Self {
            adapters,
            reconciler: Reconciler::new(config.sync.policy, progress.clone()),
            quotas: QuotaLimiter::new(config.quotas.clone(), Arc::new(tiers)),
            progress,
            locks: OwnerLocks::new(),
        })
    }

    /// Replace the tier lookup (for example with a billing-backed source).
    #[must_use]
    pub fn with_tiers(mut self, tiers: Arc<dyn TierSource>) -> Self {
        self.quotas = self.quotas.with_tiers(tiers);
        self
    }

    /// Open both on-disk stores named by the configuration.
    pub fn open(config: &TrackerConfig) -> Result<Self> {
        let local: Arc<dyn Backend> = match &config.storage.local_snapshot {
            Some(path) => Arc::new(
                LocalBackend::open(path).map_err(|e| e.into_tracker(BackendRole::Local))?,
            ),
            None => Arc::new(LocalBackend::in_memory()),
        };
        let remote = SqliteBackend::new(&config.storage.remote_db)
            .map_err(|e| e.into_tracker(BackendRole::Remote))?;
        Self::new(config, local, Arc::new(remote))
    }

    /// The adapter for one side.
    #[must_use]
    pub fn adapter(&self, role: BackendRole) -> Option<&TaskStoreAdapter> {
        self.adapters.iter().find(|a| a.role() == role)
    }

    #[must_use]
    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Create a task. Blank titles are rejected before any store is touched.
    pub fn create_task(&self, owner: &OwnerId, title: &str) -> Result<Task> {
        let draft = crate::task::NewTask::new(owner.clone(), title)?;
        self.write(owner, |adapter| {
            let (task, record) = adapter.insert(draft.clone())?;
            Ok(Applied::new(task.clone(), Effect::Put(task, record)))
        })
    }

    /// The owner's reconciled task list.
    pub fn list_tasks(&self, owner: &OwnerId) -> Result<Vec<Task>> {
        self.locks.with(owner, || {
            let order = self.order();
            let mut report = SyncReport::new(self.reconciler.policy());
            self.reconciler.reconcile_tasks(owner, &order, &mut report)
        })
    }

    /// Apply a patch. A blank title is rejected before any store is touched.
    pub fn update_task(
        &self,
        owner: &OwnerId,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<TaskChange> {
        patch.validate()?;
        self.write(owner, |adapter| {
            let (task, record) = adapter.update(owner, id, patch)?;
            let change = self.progress.task_change(task.clone(), &record);
            Ok(Applied::new(change, Effect::Put(task, record)))
        })
    }

    pub fn delete_task(&self, owner: &OwnerId, id: &TaskId) -> Result<TaskChange> {
        self.write(owner, |adapter| {
            let (task, record) = adapter.delete(owner, id)?;
            let change = self.progress.task_change(task.clone(), &record);
            Ok(Applied::new(change, Effect::Remove(task, record)))
        })
    }

    // -----------------------------------------------------------------------
    // Progress and mood
    // -----------------------------------------------------------------------

    /// Reconciled, reset-checked progress with the milestone derived fresh.
    pub fn get_progress(&self, owner: &OwnerId) -> Result<ProgressSnapshot> {
        self.locks.with(owner, || {
            let order = self.order();
            let mut report = SyncReport::new(self.reconciler.policy());
            let record = self.reconciler.reconcile_progress(owner, &order, &mut report)?;
            Ok(self.progress.snapshot(&record))
        })
    }

    /// Store an explicit mood. Does not consume a check-in.
    pub fn update_mood(&self, owner: &OwnerId, mood: &str) -> Result<ProgressRecord> {
        let mood = Mood::parse(mood)?;
        self.write(owner, |adapter| {
            let mut record = adapter.load_progress(owner)?;
            self.progress.set_mood(&mut record, mood.clone());
            adapter.save_progress(&record)?;
            Ok(Applied::new(record.clone(), Effect::Progress(record)))
        })
    }

    /// Consume a mood check-in and, when allowed, store the mood in the same
    /// critical section.
    pub fn check_in_mood(&self, owner: &OwnerId, mood: &str) -> Result<MoodCheckIn> {
        let mood = Mood::parse(mood)?;
        self.write(owner, |adapter| {
            let mut record = adapter.load_progress(owner)?;
            let quota =
                self.quotas
                    .try_increment(&mut record, QuotaClass::MoodCheckIn, self.progress.now());
            if !quota.success {
                return Ok(Applied::new(MoodCheckIn { quota, record }, Effect::Nothing));
            }
            self.progress.set_mood(&mut record, mood.clone());
            adapter.save_progress(&record)?;
            Ok(Applied::new(
                MoodCheckIn {
                    quota,
                    record: record.clone(),
                },
                Effect::Progress(record),
            ))
        })
    }

    // -----------------------------------------------------------------------
    // Quotas
    // -----------------------------------------------------------------------

    pub fn can_perform(&self, owner: &OwnerId, class: QuotaClass) -> Result<bool> {
        self.locks.with(owner, || {
            let order = self.order();
            let mut report = SyncReport::new(self.reconciler.policy());
            let record = self.reconciler.reconcile_progress(owner, &order, &mut report)?;
            Ok(self.quotas.can_perform(&record, class))
        })
    }

    pub fn increment_mood_check_in(&self, owner: &OwnerId) -> Result<QuotaOutcome> {
        self.increment(owner, QuotaClass::MoodCheckIn)
    }

    pub fn increment_ai_split(&self, owner: &OwnerId) -> Result<QuotaOutcome> {
        self.increment(owner, QuotaClass::AiSplit)
    }

    /// Consume an AI split and, when allowed, run the splitter.
    pub fn split_task(
        &self,
        owner: &OwnerId,
        text: &str,
        splitter: &dyn TaskSplitter,
    ) -> Result<SplitOutcome> {
        if text.trim().is_empty() {
            return Err(TrackerError::InvalidArgument(
                "text to split cannot be empty".to_owned(),
            ));
        }
        let quota = self.increment(owner, QuotaClass::AiSplit)?;
        let parts = if quota.success {
            splitter.split(text)
        } else {
            Vec::new()
        };
        Ok(SplitOutcome { quota, parts })
    }

    fn increment(&self, owner: &OwnerId, class: QuotaClass) -> Result<QuotaOutcome> {
        self.write(owner, |adapter| {
            let mut record = adapter.load_progress(owner)?;
            let outcome = self
                .quotas
                .try_increment(&mut record, class, self.progress.now());
            if !outcome.success {
                return Ok(Applied::new(outcome, Effect::Nothing));
            }
            adapter.save_progress(&record)?;
            Ok(Applied::new(outcome, Effect::Progress(record)))
        })
    }

    // -----------------------------------------------------------------------
    // Owner-wide
    // -----------------------------------------------------------------------

    /// Remove every task and the progress record from every store.
    ///
    /// # Errors
    ///
    /// Fails with the first [`TrackerError::BackendUnavailable`] if any store
    /// could not be purged; the reachable ones are purged regardless.
    pub fn delete_owner_data(&self, owner: &OwnerId) -> Result<()> {
        self.locks.with(owner, || {
            let mut first_error = None;
            for adapter in &self.adapters {
                match adapter.purge(owner) {
                    Ok(()) => info!(%owner, backend = %adapter.role(), "owner data purged"),
                    Err(e) => {
                        warn!(%owner, backend = %adapter.role(), error = %e, "owner purge failed");
                        first_error.get_or_insert(e);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }

    /// Run one reconciliation pass and report what it copied.
    pub fn sync_now(&self, owner: &OwnerId) -> Result<SyncReport> {
        self.locks.with(owner, || {
            let order = self.order();
            let mut report = SyncReport::new(self.reconciler.policy());
            self.reconciler.reconcile_tasks(owner, &order, &mut report)?;
            self.reconciler.reconcile_progress(owner, &order, &mut report)?;
            Ok(report)
        })
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    fn order(&self) -> Vec<&TaskStoreAdapter> {
        self.adapters.iter().collect()
    }

    fn write<T>(
        &self,
        owner: &OwnerId,
        op: impl Fn(&TaskStoreAdapter) -> Result<Applied<T>>,
    ) -> Result<T> {
        self.locks.with(owner, || {
            let order = self.order();
            let mut report = SyncReport::new(self.reconciler.policy());
            self.reconciler.reconcile_tasks(owner, &order, &mut report)?;
            self.reconciler.reconcile_progress(owner, &order, &mut report)?;

            for &adapter in &order {
                if report.unreachable.contains(&adapter.role()) {
                    continue;
                }
                match op(adapter) {
                    Ok(applied) => {
                        self.mirror(owner, adapter.role(), &order, &report, &applied.effect);
                        return Ok(applied.value);
                    }
                    Err(e @ TrackerError::BackendUnavailable { .. }) => {
                        warn!(%owner, backend = %adapter.role(), error = %e, "write failed, trying next backend");
                        report.mark_unreachable(adapter.role());
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(TrackerError::Unavailable)
        })
    }

    fn mirror(
        &self,
        owner: &OwnerId,
        applied_on: BackendRole,
        order: &[&TaskStoreAdapter],
        report: &SyncReport,
        effect: &Effect,
    ) {
        for adapter in order {
            let role = adapter.role();
            if role == applied_on || report.unreachable.contains(&role) {
                continue;
            }
            let backend = adapter.backend();
            let result = match effect {
                Effect::Nothing => continue,
                Effect::Progress(record) => backend.save_progress(record),
                Effect::Put(task, record) => backend.commit(TaskWrite::Put(task), record),
                Effect::Remove(task, record) => {
                    backend.commit(TaskWrite::Remove(owner, &task.id), record)
                }
            };
            if let Err(e) = result {
                error!(%owner, backend = %role, error = %e, "mirror write failed; next sync will repair");
            }
        }
    }
}
