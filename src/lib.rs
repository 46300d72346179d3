//! Taskpet: progress tracking and dual-store sync for a gamified task tracker.
//!
//! Every task lives in two stores, a client-resident snapshot and a
//! server-resident SQLite database. Each owner also has a progress record that
//! drives a virtual pet's mood and milestone ladder.
//!
//! # Architecture
//!
//! - **Backends** ([`backend`]): the storage seam, with a JSON snapshot store and a
//!   SQLite store
//! - **Task adapters** ([`task`]): task CRUD that keeps the progress record in step
//! - **Progress** ([`progress`], [`milestone`]): counters, daily reset, mood
//! - **Quotas** ([`quota`]): daily mood check-in and AI split caps
//! - **Sync** ([`sync`]): reconciliation between the two stores
//! - **Tracker** ([`tracker`]): the facade tying it together under per-owner locks
//! - **Host bridge** ([`host`]): versioned JSON-lines command channel

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod locks;
pub mod milestone;
pub mod progress;
pub mod quota;
pub mod split;
pub mod sync;
pub mod task;
pub mod taskpet_dirs;
pub mod tracker;

pub use backend::{Backend, BackendRole, LocalBackend, SqliteBackend};
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use milestone::{Milestone, MilestoneTable, Mood};
pub use progress::{ProgressRecord, ProgressSnapshot, TaskChange};
pub use quota::{QuotaClass, QuotaOutcome, Tier};
pub use sync::{ReconcilePolicy, SyncReport};
pub use task::{OwnerId, Task, TaskId, TaskPatch};
pub use tracker::{MoodCheckIn, SplitOutcome, Tracker};
