use taskpet::config::TrackerConfig;
use taskpet::{Backend, BackendRole, ReconcilePolicy, TaskPatch, TrackerError};

use crate::helpers::{harness, owner};

fn count_config() -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.sync.policy = ReconcilePolicy::Count;
    config
}

#[test]
fn offline_writes_converge_after_reconnect() {
    let h = harness(&TrackerConfig::default());
    let online = h.tracker.create_task(&owner(), "online").expect("create");

    h.remote.set_online(false);
    let offline = h.tracker.create_task(&owner(), "offline").expect("create offline");
    h.tracker
        .update_task(&owner(), &online.id, &TaskPatch::completed(true))
        .expect("complete offline");
    assert!(h.remote.list_tasks(&owner()).is_err());

    h.remote.set_online(true);
    let report = h.tracker.sync_now(&owner()).expect("sync");
    assert!(!report.degraded());

    let remote_tasks = h.remote.list_tasks(&owner()).expect("remote list");
    assert_eq!(remote_tasks, h.local.list_tasks(&owner()).expect("local list"));
    assert_eq!(remote_tasks.len(), 2);
    assert!(remote_tasks.iter().any(|t| t.id == offline.id));
    assert!(remote_tasks.iter().any(|t| t.id == online.id && t.completed));

    let remote_record = h.remote.load_progress(&owner()).expect("load").expect("record");
    assert_eq!(remote_record.total_tasks, 2);
    assert_eq!(remote_record.all_time_completed, 1);
}

#[test]
fn sync_report_names_unreachable_store() {
    let h = harness(&TrackerConfig::default());
    h.tracker.create_task(&owner(), "a").expect("create");
    h.local.set_online(false);

    let report = h.tracker.sync_now(&owner()).expect("sync");
    assert!(report.degraded());
    assert_eq!(report.unreachable, vec![BackendRole::Local]);

    // Reads keep working from the remaining store.
    assert_eq!(h.tracker.list_tasks(&owner()).expect("list").len(), 1);
    assert_eq!(h.tracker.get_progress(&owner()).expect("progress").total_tasks, 1);
}

#[test]
fn both_stores_down_fails_every_operation() {
    let h = harness(&TrackerConfig::default());
    h.local.set_online(false);
    h.remote.set_online(false);

    assert!(matches!(h.tracker.list_tasks(&owner()), Err(TrackerError::Unavailable)));
    assert!(matches!(h.tracker.sync_now(&owner()), Err(TrackerError::Unavailable)));
    assert!(matches!(
        h.tracker.increment_ai_split(&owner()),
        Err(TrackerError::Unavailable)
    ));
}

#[test]
fn count_policy_copies_populated_list_to_empty_store() {
    let h = harness(&count_config());
    h.remote.set_online(false);
    for title in ["a", "b", "c"] {
        h.tracker.create_task(&owner(), title).expect("create");
    }
    h.remote.set_online(true);

    let report = h.tracker.sync_now(&owner()).expect("sync");
    assert_eq!(report.policy, ReconcilePolicy::Count);
    assert_eq!(report.task_copies.len(), 1);
    assert_eq!(report.task_copies[0].to, BackendRole::Remote);
    assert_eq!(report.task_copies[0].tasks, 3);
    assert_eq!(h.remote.list_tasks(&owner()).expect("list").len(), 3);
}

#[test]
fn local_primary_writes_local_first() {
    let mut config = TrackerConfig::default();
    config.sync.primary = BackendRole::Local;
    let h = harness(&config);
    h.remote.set_online(false);

    h.tracker.create_task(&owner(), "a").expect("create");
    assert_eq!(h.local.list_tasks(&owner()).expect("list").len(), 1);
    assert!(h.tracker.adapter(BackendRole::Local).is_some());
}
