//! Error types for the task tracker core.

use crate::backend::BackendRole;

/// Top-level error type for tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The task id does not exist for the owner in the targeted backend.
    #[error("task not found: {task_id}")]
    NotFound {
        /// Id that was looked up.
        task_id: String,
    },

    /// Caller supplied an invalid value (empty title, empty mood, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A single backend could not be reached.
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        /// Which backend failed.
        backend: BackendRole,
        /// Underlying failure description.
        reason: String,
    },

    /// Neither backend could be reached.
    #[error("no storage backend available")]
    Unavailable,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A per-owner or store lock was poisoned.
    #[error("lock poisoned: {0}")]
    Lock(String),

    /// Host bridge channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

impl TrackerError {
    /// Stable machine-readable category, used on the host wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::Unavailable => "unavailable",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Lock(_) => "lock",
            Self::Channel(_) => "channel",
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TrackerError>;
