//! Host command channel and router.
//!
//! The client side is async (`mpsc` requests, `oneshot` replies, `broadcast`
//! events). Routing is synchronous and runs on the blocking pool, because
//! every tracker call takes an owner lock and touches storage.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error};

use crate::error::{Result, TrackerError};
use crate::host::contract::{
    CommandEnvelope, CommandName, EVENT_VERSION, EventEnvelope, PROGRESS_CHANGED,
    ResponseEnvelope,
};
use crate::quota::QuotaClass;
use crate::split::TaskSplitter;
use crate::task::{OwnerId, TaskId, TaskPatch};
use crate::tracker::Tracker;

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    /// Send one command and wait for its response.
    ///
    /// Tracker failures come back as `ok: false` responses; `Err` means the
    /// envelope was invalid or the channel is gone.
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            TrackerError::InvalidArgument(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| {
                TrackerError::Channel(format!("failed to send host command request: {e}"))
            })?;

        response_rx
            .await
            .map_err(|e| TrackerError::Channel(format!("host command response dropped: {e}")))
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

/// Maps command envelopes onto tracker calls.
pub struct CommandRouter {
    tracker: Arc<Tracker>,
    splitter: Arc<dyn TaskSplitter>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

pub struct HostCommandServer {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    router: Arc<CommandRouter>,
}

#[must_use]
pub fn command_channel(
    request_capacity: usize,
    event_capacity: usize,
    tracker: Arc<Tracker>,
    splitter: Arc<dyn TaskSplitter>,
) -> (HostCommandClient, HostCommandServer) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            router: Arc::new(CommandRouter {
                tracker,
                splitter,
                event_tx,
            }),
        },
    )
}

impl HostCommandServer {
    /// Serve requests one at a time until every client is dropped.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let router = Arc::clone(&self.router);
            let request_id = request.envelope.request_id.clone();
            let envelope = request.envelope;

            let response = match tokio::task::spawn_blocking(move || router.dispatch(&envelope))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!(request_id = %request_id, error = %e, "host command handler failed");
                    ResponseEnvelope::error(request_id, format!("command handler failed: {e}"))
                }
            };
            let _ = request.response_tx.send(response);
        }
    }

    #[must_use]
    pub fn router(&self) -> &CommandRouter {
        &self.router
    }
}

impl CommandRouter {
    /// Route and fold any error into an `ok: false` response.
    #[must_use]
    pub fn dispatch(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        match self.route(envelope) {
            Ok(response) => response,
            Err(e) => {
                debug!(
                    request_id = %envelope.request_id,
                    command = envelope.command.as_str(),
                    error = %e,
                    "host command rejected"
                );
                ResponseEnvelope::failure(envelope.request_id.clone(), &e)
            }
        }
    }

    /// Route a command envelope to the appropriate tracker call.
    pub fn route(&self, envelope: &CommandEnvelope) -> Result<ResponseEnvelope> {
        let payload = match envelope.command {
            CommandName::HostPing => serde_json::json!({"pong": true}),
            CommandName::HostVersion => serde_json::json!({
                "contract_version": EVENT_VERSION,
                "package_version": env!("CARGO_PKG_VERSION"),
            }),
            CommandName::TaskCreate => self.handle_task_create(envelope)?,
            CommandName::TaskList => self.handle_task_list(envelope)?,
            CommandName::TaskUpdate => self.handle_task_update(envelope)?,
            CommandName::TaskDelete => self.handle_task_delete(envelope)?,
            CommandName::ProgressGet => {
                let owner = parse_owner(&envelope.payload, envelope.command)?;
                to_payload(&self.tracker.get_progress(&owner)?)?
            }
            CommandName::MoodUpdate => self.handle_mood_update(envelope)?,
            CommandName::MoodCheckIn => self.handle_mood_check_in(envelope)?,
            CommandName::QuotaCanPerform => self.handle_quota_can_perform(envelope)?,
            CommandName::QuotaMoodCheckIn => {
                self.handle_quota_increment(envelope, QuotaClass::MoodCheckIn)?
            }
            CommandName::QuotaAiSplit => {
                self.handle_quota_increment(envelope, QuotaClass::AiSplit)?
            }
            CommandName::AiSplit => self.handle_ai_split(envelope)?,
            CommandName::SyncRun => {
                let owner = parse_owner(&envelope.payload, envelope.command)?;
                to_payload(&self.tracker.sync_now(&owner)?)?
            }
            CommandName::OwnerPurge => {
                let owner = parse_owner(&envelope.payload, envelope.command)?;
                self.tracker.delete_owner_data(&owner)?;
                self.emit_progress_changed(&owner, envelope.command);
                serde_json::json!({"purged": true})
            }
            CommandName::RuntimeStop => serde_json::json!({"stopping": true}),
        };
        Ok(ResponseEnvelope::ok(envelope.request_id.clone(), payload))
    }

    fn handle_task_create(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let title = parse_string_field(&envelope.payload, "title", envelope.command)?;
        let task = self.tracker.create_task(&owner, &title)?;
        self.emit_progress_changed(&owner, envelope.command);
        Ok(serde_json::json!({ "task": to_payload(&task)? }))
    }

    fn handle_task_list(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let tasks = self.tracker.list_tasks(&owner)?;
        Ok(serde_json::json!({ "tasks": to_payload(&tasks)? }))
    }

    fn handle_task_update(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let task_id = parse_task_id(&envelope.payload, envelope.command)?;
        let patch: TaskPatch = serde_json::from_value(envelope.payload.clone()).map_err(|e| {
            TrackerError::InvalidArgument(format!("task.update has an invalid patch: {e}"))
        })?;
        let change = self.tracker.update_task(&owner, &task_id, &patch)?;
        self.emit_progress_changed(&owner, envelope.command);
        to_payload(&change)
    }

    fn handle_task_delete(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let task_id = parse_task_id(&envelope.payload, envelope.command)?;
        let change = self.tracker.delete_task(&owner, &task_id)?;
        self.emit_progress_changed(&owner, envelope.command);
        to_payload(&change)
    }

    fn handle_mood_update(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let mood = parse_string_field(&envelope.payload, "mood", envelope.command)?;
        let record = self.tracker.update_mood(&owner, &mood)?;
        self.emit_progress_changed(&owner, envelope.command);
        to_payload(&record)
    }

    fn handle_mood_check_in(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let mood = parse_string_field(&envelope.payload, "mood", envelope.command)?;
        let outcome = self.tracker.check_in_mood(&owner, &mood)?;
        if outcome.quota.success {
            self.emit_progress_changed(&owner, envelope.command);
        }
        Ok(serde_json::json!({
            "quota": outcome.quota.to_json(),
            "progress": to_payload(&outcome.record)?,
        }))
    }

    fn handle_quota_can_perform(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let class = parse_quota_class(&envelope.payload, envelope.command)?;
        let allowed = self.tracker.can_perform(&owner, class)?;
        Ok(serde_json::json!({ "class": class, "allowed": allowed }))
    }

    fn handle_quota_increment(
        &self,
        envelope: &CommandEnvelope,
        class: QuotaClass,
    ) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let outcome = match class {
            QuotaClass::MoodCheckIn => self.tracker.increment_mood_check_in(&owner)?,
            QuotaClass::AiSplit => self.tracker.increment_ai_split(&owner)?,
        };
        if outcome.success {
            self.emit_progress_changed(&owner, envelope.command);
        }
        Ok(outcome.to_json())
    }

    fn handle_ai_split(&self, envelope: &CommandEnvelope) -> Result<serde_json::Value> {
        let owner = parse_owner(&envelope.payload, envelope.command)?;
        let text = parse_string_field(&envelope.payload, "text", envelope.command)?;
        let outcome = self
            .tracker
            .split_task(&owner, &text, self.splitter.as_ref())?;
        if outcome.quota.success {
            self.emit_progress_changed(&owner, envelope.command);
        }
        Ok(serde_json::json!({
            "quota": outcome.quota.to_json(),
            "parts": outcome.parts,
        }))
    }

    fn emit_progress_changed(&self, owner: &OwnerId, cause: CommandName) {
        let envelope = EventEnvelope::new(
            uuid::Uuid::new_v4().to_string(),
            PROGRESS_CHANGED,
            serde_json::json!({ "owner_id": owner, "cause": cause.as_str() }),
        );
        let _ = self.event_tx.send(envelope);
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| TrackerError::Channel(format!("failed to serialize response payload: {e}")))
}

fn parse_owner(payload: &serde_json::Value, command: CommandName) -> Result<OwnerId> {
    parse_non_empty_field(payload, "owner_id", command).map(OwnerId::new)
}

fn parse_task_id(payload: &serde_json::Value, command: CommandName) -> Result<TaskId> {
    parse_non_empty_field(payload, "task_id", command).map(TaskId::new)
}

fn parse_quota_class(payload: &serde_json::Value, command: CommandName) -> Result<QuotaClass> {
    let raw = parse_non_empty_field(payload, "class", command)?;
    serde_json::from_value(serde_json::Value::String(raw.clone())).map_err(|_| {
        TrackerError::InvalidArgument(format!(
            "unsupported quota class `{raw}` (expected mood_check_in/ai_split)"
        ))
    })
}

/// A required string field; blank values are left for the tracker to judge.
fn parse_string_field(
    payload: &serde_json::Value,
    key: &str,
    command: CommandName,
) -> Result<String> {
    payload
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            TrackerError::InvalidArgument(format!(
                "{} requires payload.{key}",
                command.as_str()
            ))
        })
}

fn parse_non_empty_field(
    payload: &serde_json::Value,
    key: &str,
    command: CommandName,
) -> Result<String> {
    let value = parse_string_field(payload, key, command)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidArgument(format!(
            "{} requires a non-empty payload.{key}",
            command.as_str()
        )));
    }
    Ok(trimmed.to_owned())
}
