//! Configuration types for the task tracker.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::BackendRole;
use crate::error::{Result, TrackerError};
use crate::milestone::{MilestoneTable, MilestoneTier, default_tiers};
use crate::quota::QuotaConfig;
use crate::sync::ReconcilePolicy;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Milestone ladder, ascending by threshold. Shared by both backends.
    pub milestones: Vec<MilestoneTier>,
    pub quotas: QuotaConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            milestones: default_tiers(),
            quotas: QuotaConfig::default(),
            sync: SyncConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub policy: ReconcilePolicy,
    /// Backend tried first for writes and preferred on ties.
    pub primary: BackendRole,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: ReconcilePolicy::default(),
            primary: BackendRole::Remote,
        }
    }
}

/// Where the two stores live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot for the client-resident store. `None` keeps it in memory.
    pub local_snapshot: Option<PathBuf>,
    /// SQLite database for the server-resident store.
    pub remote_db: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_snapshot: Some(crate::taskpet_dirs::local_snapshot_file()),
            remote_db: crate::taskpet_dirs::remote_db_file(),
        }
    }
}

/// Logging settings for the host binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Also write a daily-rolling log file under the logs directory.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "taskpet=info".to_owned(),
            file_logging: false,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TrackerError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| TrackerError::Config(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TrackerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::taskpet_dirs::config_file()
    }

    /// Validated milestone ladder.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] for an unusable ladder.
    pub fn milestone_table(&self) -> Result<MilestoneTable> {
        MilestoneTable::new(self.milestones.clone())
    }

    /// Check every section that can be wrong.
    pub fn validate(&self) -> Result<()> {
        self.milestone_table()?;
        if self.logging.filter.trim().is_empty() {
            return Err(TrackerError::Config("logging.filter cannot be empty".to_owned()));
        }
        Ok(())
    }
}
