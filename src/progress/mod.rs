//! Aggregate progress: per-owner counters, daily reset window, and the
//! milestone-driven mood.

pub mod manager;
pub mod reset;
pub mod types;

pub use manager::{ProgressManager, resolve_mood};
pub use reset::{DAY_MS, apply_daily_reset, days_since_reset};
pub use types::{CycleCounters, ProgressRecord, ProgressSnapshot, TaskChange};
