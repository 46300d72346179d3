use std::sync::Arc;

use taskpet::config::TrackerConfig;
use taskpet::milestone::MilestoneTier;
use taskpet::{Backend, LocalBackend, QuotaClass, SqliteBackend, TaskPatch, Tracker};

use crate::helpers::owner;

fn on_disk_config(dir: &std::path::Path) -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.storage.local_snapshot = Some(dir.join("local.json"));
    config.storage.remote_db = dir.join("remote").join("taskpet.db");
    config
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = on_disk_config(dir.path());

    let task_id = {
        let tracker = Tracker::open(&config).expect("open");
        let task = tracker.create_task(&owner(), "persist me").expect("create");
        tracker
            .update_task(&owner(), &task.id, &TaskPatch::completed(true))
            .expect("complete");
        tracker.check_in_mood(&owner(), "proud").expect("check in");
        task.id
    };

    let tracker = Tracker::open(&config).expect("reopen");
    let tasks = tracker.list_tasks(&owner()).expect("list");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert!(tasks[0].completed);

    let snap = tracker.get_progress(&owner()).expect("progress");
    assert_eq!(snap.all_time_completed, 1);
    assert_eq!(snap.mood.as_str(), "proud");
    assert!(!tracker.can_perform(&owner(), QuotaClass::MoodCheckIn).expect("can"));
}

#[test]
fn missing_local_snapshot_is_rebuilt_from_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = on_disk_config(dir.path());

    {
        let tracker = Tracker::open(&config).expect("open");
        tracker.create_task(&owner(), "a").expect("create a");
        tracker.create_task(&owner(), "b").expect("create b");
    }
    std::fs::remove_file(dir.path().join("local.json")).expect("remove snapshot");

    let tracker = Tracker::open(&config).expect("reopen");
    let report = tracker.sync_now(&owner()).expect("sync");
    assert!(!report.degraded());
    assert!(dir.path().join("local.json").exists());
    assert_eq!(tracker.list_tasks(&owner()).expect("list").len(), 2);
}

#[test]
fn purge_removes_owner_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = on_disk_config(dir.path());

    {
        let tracker = Tracker::open(&config).expect("open");
        tracker.create_task(&owner(), "a").expect("create");
        tracker.delete_owner_data(&owner()).expect("purge");
    }

    let tracker = Tracker::open(&config).expect("reopen");
    assert!(tracker.list_tasks(&owner()).expect("list").is_empty());
    assert_eq!(tracker.get_progress(&owner()).expect("progress").total_tasks, 0);
}

struct Paired {
    tracker: Tracker,
    local: Arc<LocalBackend>,
    remote: Arc<SqliteBackend>,
}

/// Wall-clock tracker over the production pairing of stores.
fn paired(config: &TrackerConfig) -> Paired {
    let local = Arc::new(LocalBackend::in_memory());
    let remote = Arc::new(SqliteBackend::open_in_memory().expect("open sqlite"));
    let tracker = Tracker::new(config, local.clone(), remote.clone()).expect("build tracker");
    Paired {
        tracker,
        local,
        remote,
    }
}

#[test]
fn wall_clock_writes_reach_steady_state() {
    let p = paired(&TrackerConfig::default());
    let task = p.tracker.create_task(&owner(), "water plants").expect("create");
    p.tracker
        .update_task(&owner(), &task.id, &TaskPatch::completed(true))
        .expect("complete");

    for _ in 0..3 {
        let report = p.tracker.sync_now(&owner()).expect("sync");
        assert!(report.task_copies.is_empty(), "{report:?}");
        assert!(report.progress_copied_to.is_empty(), "{report:?}");
    }

    assert_eq!(
        p.local.list_tasks(&owner()).expect("local list"),
        p.remote.list_tasks(&owner()).expect("remote list")
    );
    assert_eq!(
        p.local.load_progress(&owner()).expect("local load"),
        p.remote.load_progress(&owner()).expect("remote load")
    );
}

#[test]
fn mixed_case_ladder_yields_same_mood_in_both_stores() {
    let config = TrackerConfig {
        milestones: vec![MilestoneTier::new(0, "Low", 10), MilestoneTier::new(1, "MID", 15)],
        ..TrackerConfig::default()
    };
    let p = paired(&config);
    let task = p.tracker.create_task(&owner(), "a").expect("create");
    assert_eq!(p.tracker.get_progress(&owner()).expect("progress").mood.as_str(), "low");

    let change = p
        .tracker
        .update_task(&owner(), &task.id, &TaskPatch::completed(true))
        .expect("complete");
    assert_eq!(change.new_mood.as_str(), "mid");

    let local = p.local.load_progress(&owner()).expect("load").expect("record");
    let remote = p.remote.load_progress(&owner()).expect("load").expect("record");
    assert_eq!(local.mood, remote.mood);
    assert_eq!(local, remote);
    assert!(p.tracker.sync_now(&owner()).expect("sync").progress_copied_to.is_empty());
}
