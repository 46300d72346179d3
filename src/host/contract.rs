//! Versioned host command/event envelopes for UI and API integrations.

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Event emitted after any call that changed an owner's progress.
pub const PROGRESS_CHANGED: &str = "progress.changed";

/// Command set for host integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "task.create")]
    TaskCreate,
    #[serde(rename = "task.list")]
    TaskList,
    #[serde(rename = "task.update")]
    TaskUpdate,
    #[serde(rename = "task.delete")]
    TaskDelete,
    #[serde(rename = "progress.get")]
    ProgressGet,
    #[serde(rename = "mood.update")]
    MoodUpdate,
    #[serde(rename = "mood.check_in")]
    MoodCheckIn,
    #[serde(rename = "quota.can_perform")]
    QuotaCanPerform,
    #[serde(rename = "quota.mood_check_in")]
    QuotaMoodCheckIn,
    #[serde(rename = "quota.ai_split")]
    QuotaAiSplit,
    #[serde(rename = "ai.split")]
    AiSplit,
    #[serde(rename = "sync.run")]
    SyncRun,
    #[serde(rename = "owner.purge")]
    OwnerPurge,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

impl CommandName {
    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::TaskCreate => "task.create",
            Self::TaskList => "task.list",
            Self::TaskUpdate => "task.update",
            Self::TaskDelete => "task.delete",
            Self::ProgressGet => "progress.get",
            Self::MoodUpdate => "mood.update",
            Self::MoodCheckIn => "mood.check_in",
            Self::QuotaCanPerform => "quota.can_perform",
            Self::QuotaMoodCheckIn => "quota.mood_check_in",
            Self::QuotaAiSplit => "quota.ai_split",
            Self::AiSplit => "ai.split",
            Self::SyncRun => "sync.run",
            Self::OwnerPurge => "owner.purge",
            Self::RuntimeStop => "runtime.stop",
        }
    }
}

/// A versioned response envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }

    /// Error response carrying the error category in `payload.kind`.
    #[must_use]
    pub fn failure(request_id: impl Into<String>, err: &TrackerError) -> Self {
        Self {
            payload: serde_json::json!({ "kind": err.kind() }),
            ..Self::error(request_id, err.to_string())
        }
    }
}

/// A versioned command envelope from frontend -> backend host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}
