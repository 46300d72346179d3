use std::sync::Arc;

use chrono::Duration;
use taskpet::config::TrackerConfig;
use taskpet::milestone::MilestoneTier;
use taskpet::{Backend, QuotaClass, TaskPatch, TrackerError};

use crate::helpers::{harness, owner, start};

#[test]
fn tenth_completion_climbs_to_second_rung() {
    let h = harness(&TrackerConfig::default());
    let ids: Vec<_> = (0..10)
        .map(|i| h.tracker.create_task(&owner(), &format!("task {i}")).expect("create").id)
        .collect();

    for id in &ids[..9] {
        h.tracker
            .update_task(&owner(), id, &TaskPatch::completed(true))
            .expect("complete");
    }
    let before = h.tracker.get_progress(&owner()).expect("progress");
    assert_eq!(before.all_time_completed, 9);
    assert_eq!(before.current_milestone, 0);
    assert_eq!(before.display_completed, 9);
    assert_eq!(before.max_value, 10);

    let change = h
        .tracker
        .update_task(&owner(), &ids[9], &TaskPatch::completed(true))
        .expect("complete tenth");
    assert_eq!(change.all_time_completed, 10);
    assert_eq!(change.current_milestone, 1);
    assert_eq!(change.display_completed, 0);
    assert_eq!(change.max_value, 15);
    assert_eq!(change.new_mood.as_str(), "calm");
}

#[test]
fn stale_reset_date_zeroes_daily_counters_on_read() {
    let h = harness(&TrackerConfig::default());
    let task = h.tracker.create_task(&owner(), "stretch").expect("create");
    h.tracker
        .update_task(&owner(), &task.id, &TaskPatch::completed(true))
        .expect("complete");
    h.tracker.increment_mood_check_in(&owner()).expect("check in");
    h.tracker.increment_ai_split(&owner()).expect("split");

    h.clock.advance(Duration::hours(25));
    let snap = h.tracker.get_progress(&owner()).expect("progress");
    assert_eq!(snap.completed_tasks, 0);
    assert_eq!(snap.daily_completed_tasks, 0);
    assert_eq!(snap.daily_mood_checks, 0);
    assert_eq!(snap.daily_ai_splits, 0);
    assert_eq!(snap.all_time_completed, 1);
    assert_eq!(snap.total_tasks, 1);
    assert_eq!(snap.last_reset_date, start() + Duration::hours(25));

    // The reset is persisted to both stores.
    for store in [&h.local, &h.remote] {
        let record = store.load_progress(&owner()).expect("load").expect("record");
        assert_eq!(record.daily_mood_checks, 0);
        assert_eq!(record.last_reset_date, start() + Duration::hours(25));
    }
}

#[test]
fn twenty_three_hours_is_not_a_new_day() {
    let h = harness(&TrackerConfig::default());
    h.tracker.increment_mood_check_in(&owner()).expect("check in");
    h.clock.advance(Duration::hours(23));
    let snap = h.tracker.get_progress(&owner()).expect("progress");
    assert_eq!(snap.daily_mood_checks, 1);
    assert_eq!(snap.last_reset_date, start());
}

#[test]
fn uncomplete_and_delete_give_back_exactly_what_was_added() {
    let config = TrackerConfig {
        milestones: vec![MilestoneTier::new(0, "low", 10), MilestoneTier::new(1, "mid", 15)],
        ..TrackerConfig::default()
    };
    let h = harness(&config);
    let a = h.tracker.create_task(&owner(), "a").expect("create a");
    let b = h.tracker.create_task(&owner(), "b").expect("create b");

    h.tracker
        .update_task(&owner(), &a.id, &TaskPatch::completed(true))
        .expect("complete a");
    let undone = h
        .tracker
        .update_task(&owner(), &a.id, &TaskPatch::completed(false))
        .expect("uncomplete a");
    assert_eq!(undone.completed_tasks, 0);
    assert_eq!(undone.all_time_completed, 0);
    assert_eq!(undone.current_milestone, 0);
    assert_eq!(undone.new_mood.as_str(), "low");

    h.tracker
        .update_task(&owner(), &b.id, &TaskPatch::completed(true))
        .expect("complete b");
    let deleted = h.tracker.delete_task(&owner(), &b.id).expect("delete b");
    assert_eq!(deleted.task.id, b.id);
    assert_eq!(deleted.completed_tasks, 0);
    assert_eq!(deleted.all_time_completed, 0);

    let snap = h.tracker.get_progress(&owner()).expect("progress");
    assert_eq!(snap.total_tasks, 1);
    assert_eq!(h.tracker.list_tasks(&owner()).expect("list"), vec![a]);
}

#[test]
fn empty_inputs_are_rejected() {
    let h = harness(&TrackerConfig::default());
    assert!(matches!(
        h.tracker.create_task(&owner(), "  "),
        Err(TrackerError::InvalidArgument(_))
    ));
    assert!(matches!(
        h.tracker.update_mood(&owner(), ""),
        Err(TrackerError::InvalidArgument(_))
    ));
    assert!(matches!(
        h.tracker.delete_task(&owner(), &"nope".into()),
        Err(TrackerError::NotFound { .. })
    ));
}

#[test]
fn rate_limit_sequence_is_exact() {
    let h = harness(&TrackerConfig::default());
    assert!(h.tracker.can_perform(&owner(), QuotaClass::MoodCheckIn).expect("can"));
    let first = h.tracker.increment_mood_check_in(&owner()).expect("first");
    assert!(first.success);
    assert!(!h.tracker.can_perform(&owner(), QuotaClass::MoodCheckIn).expect("can"));
    let second = h.tracker.increment_mood_check_in(&owner()).expect("second");
    assert!(!second.success);
    assert!(second.limit_reached);
    assert_eq!(second.counter, 1);
    assert_eq!(
        h.tracker.get_progress(&owner()).expect("progress").daily_mood_checks,
        1
    );
}

#[test]
fn concurrent_completions_lose_no_updates() {
    let h = harness(&TrackerConfig::default());
    let ids: Vec<_> = (0..16)
        .map(|i| h.tracker.create_task(&owner(), &format!("t{i}")).expect("create").id)
        .collect();
    let tracker = Arc::new(h.tracker);

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || {
                tracker
                    .update_task(&owner(), &id, &TaskPatch::completed(true))
                    .expect("complete");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let snap = tracker.get_progress(&owner()).expect("progress");
    assert_eq!(snap.completed_tasks, 16);
    assert_eq!(snap.all_time_completed, 16);
    assert_eq!(
        h.local.load_progress(&owner()).expect("load"),
        h.remote.load_progress(&owner()).expect("load")
    );
}

#[test]
fn concurrent_quota_increments_never_exceed_limit() {
    let h = harness(&TrackerConfig::default());
    let tracker = Arc::new(h.tracker);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || tracker.increment_ai_split(&owner()).expect("increment"))
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .filter(|outcome| outcome.success)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(
        tracker.get_progress(&owner()).expect("progress").daily_ai_splits,
        1
    );
}
