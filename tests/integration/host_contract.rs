use std::sync::Arc;

use taskpet::config::TrackerConfig;
use taskpet::host::channel::command_channel;
use taskpet::host::contract::{CommandEnvelope, CommandName, PROGRESS_CHANGED};
use taskpet::split::SentenceSplitter;

use crate::helpers::{drain_events, harness};

fn envelope(id: &str, command: CommandName, payload: serde_json::Value) -> CommandEnvelope {
    CommandEnvelope::new(id, command, payload)
}

#[tokio::test]
async fn task_lifecycle_over_channel() {
    let h = harness(&TrackerConfig::default());
    let (client, server) = command_channel(
        8,
        32,
        Arc::new(h.tracker),
        Arc::new(SentenceSplitter),
    );
    let mut events = client.subscribe_events();
    let server_task = tokio::spawn(server.run());

    let created = client
        .send(envelope(
            "r1",
            CommandName::TaskCreate,
            serde_json::json!({"owner_id": "u1", "title": "  feed the pet "}),
        ))
        .await
        .expect("send create");
    assert!(created.ok);
    assert_eq!(created.request_id, "r1");
    assert_eq!(created.payload["task"]["title"], "feed the pet");
    let task_id = created.payload["task"]["id"].as_str().expect("id").to_owned();

    let listed = client
        .send(envelope(
            "r2",
            CommandName::TaskList,
            serde_json::json!({"owner_id": "u1"}),
        ))
        .await
        .expect("send list");
    assert_eq!(listed.payload["tasks"].as_array().expect("tasks").len(), 1);

    let deleted = client
        .send(envelope(
            "r3",
            CommandName::TaskDelete,
            serde_json::json!({"owner_id": "u1", "task_id": task_id}),
        ))
        .await
        .expect("send delete");
    assert!(deleted.ok);
    assert_eq!(deleted.payload["task"]["id"], task_id.as_str());

    let progress = client
        .send(envelope(
            "r4",
            CommandName::ProgressGet,
            serde_json::json!({"owner_id": "u1"}),
        ))
        .await
        .expect("send progress");
    assert_eq!(progress.payload["totalTasks"], 0);
    assert_eq!(progress.payload["mood"], "sleepy");

    let changed = drain_events(&mut events);
    assert_eq!(changed.len(), 2);
    assert!(changed.iter().all(|e| e.event == PROGRESS_CHANGED));

    drop(client);
    server_task.await.expect("server exits");
}

#[tokio::test]
async fn quota_refusal_is_ok_response_without_event() {
    let h = harness(&TrackerConfig::default());
    let (client, server) = command_channel(
        8,
        32,
        Arc::new(h.tracker),
        Arc::new(SentenceSplitter),
    );
    let mut events = client.subscribe_events();
    let server_task = tokio::spawn(server.run());

    let split = |id: &'static str| {
        envelope(
            id,
            CommandName::AiSplit,
            serde_json::json!({"owner_id": "u2", "text": "Shop. Cook. Eat."}),
        )
    };

    let first = client.send(split("s1")).await.expect("first split");
    assert!(first.ok);
    assert_eq!(first.payload["quota"]["success"], true);
    assert_eq!(first.payload["quota"]["dailyAISplits"], 1);
    assert_eq!(first.payload["parts"], serde_json::json!(["Shop", "Cook", "Eat"]));
    assert_eq!(drain_events(&mut events).len(), 1);

    let second = client.send(split("s2")).await.expect("second split");
    assert!(second.ok);
    assert_eq!(second.payload["quota"]["success"], false);
    assert_eq!(second.payload["quota"]["limitReached"], true);
    assert_eq!(second.payload["parts"], serde_json::json!([]));
    assert!(drain_events(&mut events).is_empty());

    drop(client);
    server_task.await.expect("server exits");
}

#[tokio::test]
async fn backend_outage_maps_to_error_kind() {
    let h = harness(&TrackerConfig::default());
    h.local.set_online(false);
    h.remote.set_online(false);
    let (client, server) = command_channel(
        8,
        8,
        Arc::new(h.tracker),
        Arc::new(SentenceSplitter),
    );
    let server_task = tokio::spawn(server.run());

    let resp = client
        .send(envelope(
            "r1",
            CommandName::SyncRun,
            serde_json::json!({"owner_id": "u3"}),
        ))
        .await
        .expect("send sync");
    assert!(!resp.ok);
    assert_eq!(resp.payload["kind"], "unavailable");
    assert!(resp.error.is_some());

    drop(client);
    server_task.await.expect("server exits");
}

#[test]
fn version_reports_contract_and_package() {
    let h = harness(&TrackerConfig::default());
    let (_client, server) = command_channel(
        1,
        1,
        Arc::new(h.tracker),
        Arc::new(SentenceSplitter),
    );
    let resp = server
        .router()
        .route(&envelope("v", CommandName::HostVersion, serde_json::json!({})))
        .expect("route version");
    assert_eq!(resp.payload["contract_version"], 1);
    assert!(resp.payload["package_version"].is_string());
}
