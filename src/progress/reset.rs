//! Daily reset window.
//!
//! Cycle-scoped counters zero once a full day has elapsed since
//! `last_reset_date`. Lifetime counters are untouched, so the progress bar
//! restarts each day while the milestone ladder keeps climbing.

use chrono::{DateTime, Utc};

use super::types::ProgressRecord;

/// Length of one reset window in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Whole days elapsed between `last_reset` and `now` (never negative).
#[must_use]
pub fn days_since_reset(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed = now.signed_duration_since(last_reset).num_milliseconds();
    if elapsed <= 0 {
        return 0;
    }
    elapsed / DAY_MS
}

/// Zero the cycle counters if the window has rolled over.
///
/// Returns `true` when the record was modified and needs persisting.
pub fn apply_daily_reset(record: &mut ProgressRecord, now: DateTime<Utc>) -> bool {
    if days_since_reset(record.last_reset_date, now) < 1 {
        return false;
    }
    record.daily_completed_tasks = 0;
    record.completed_tasks = 0;
    record.daily_mood_checks = 0;
    record.daily_ai_splits = 0;
    record.last_reset_date = now;
    true
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::milestone::Mood;
    use crate::task::OwnerId;
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn busy_record() -> ProgressRecord {
        let mut r = ProgressRecord::new(OwnerId::from("o"), Mood::parse("calm").unwrap(), start());
        r.completed_tasks = 3;
        r.daily_completed_tasks = 3;
        r.daily_mood_checks = 1;
        r.daily_ai_splits = 2;
        r.all_time_completed = 40;
        r
    }

    #[test]
    fn counts_whole_days_only() {
        assert_eq!(days_since_reset(start(), start() + Duration::hours(23)), 0);
        assert_eq!(days_since_reset(start(), start() + Duration::hours(24)), 1);
        assert_eq!(days_since_reset(start(), start() + Duration::hours(49)), 2);
    }

    #[test]
    fn clock_skew_backwards_never_resets() {
        assert_eq!(days_since_reset(start(), start() - Duration::days(3)), 0);
    }

    #[test]
    fn resets_after_twenty_five_hours() {
        let mut r = busy_record();
        let now = start() + Duration::hours(25);
        assert!(apply_daily_reset(&mut r, now));
        assert_eq!(r.completed_tasks, 0);
        assert_eq!(r.daily_completed_tasks, 0);
        assert_eq!(r.daily_mood_checks, 0);
        assert_eq!(r.daily_ai_splits, 0);
        assert_eq!(r.last_reset_date, now);
        assert_eq!(r.all_time_completed, 40);
    }

    #[test]
    fn second_reset_same_day_is_noop() {
        let mut r = busy_record();
        let now = start() + Duration::hours(25);
        assert!(apply_daily_reset(&mut r, now));
        let after_first = r.clone();
        assert!(!apply_daily_reset(&mut r, now + Duration::hours(2)));
        assert_eq!(r, after_first);
    }
}
