//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/taskpet/` | `~/.local/share/taskpet/` |
//! | Config | `~/Library/Application Support/taskpet/` | `~/.config/taskpet/` |
//!
//! Overrides: `TASKPET_DATA_DIR` for [`data_dir`], `TASKPET_CONFIG_DIR` for
//! [`config_dir`].

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the local task snapshot, the SQLite database and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("TASKPET_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("taskpet"))
        .unwrap_or_else(|| PathBuf::from("/tmp/taskpet-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("TASKPET_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("taskpet"))
        .unwrap_or_else(|| PathBuf::from("/tmp/taskpet-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Client-resident task snapshot (`data_dir()/local.json`).
#[must_use]
pub fn local_snapshot_file() -> PathBuf {
    data_dir().join("local.json")
}

/// Server-resident database (`data_dir()/taskpet.db`).
#[must_use]
pub fn remote_db_file() -> PathBuf {
    data_dir().join("taskpet.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_nonempty() {
        let dir = data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn config_file_is_toml_under_config_dir() {
        let file = config_file();
        assert!(file.starts_with(config_dir()));
        assert_eq!(file.extension().and_then(|e| e.to_str()), Some("toml"));
    }

    #[test]
    fn store_files_live_under_data_dir() {
        assert!(local_snapshot_file().starts_with(data_dir()));
        assert!(remote_db_file().starts_with(data_dir()));
        assert!(logs_dir().starts_with(data_dir()));
    }
}
