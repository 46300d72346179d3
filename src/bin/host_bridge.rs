//! Headless host bridge binary for stdin/stdout JSON communication.
//!
//! Reads `CommandEnvelope` lines from stdin, serves them from a [`Tracker`]
//! over the configured local snapshot and SQLite database, and writes
//! responses and events to stdout.
//!
//! All tracing output goes to stderr (and optionally a daily log file) so
//! stdout stays a clean protocol channel.
//!
//! `TASKPET_CONFIG` overrides the config file path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use taskpet::config::{LoggingConfig, TrackerConfig};
use taskpet::host::stdio::run_stdio_bridge;
use taskpet::split::SentenceSplitter;
use taskpet::{Tracker, taskpet_dirs};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("TASKPET_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(TrackerConfig::default_config_path);
    let config = TrackerConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let _log_guard = init_tracing(&config.logging)?;
    tracing::info!(config = %config_path.display(), "taskpet-host starting");

    let tracker = Tracker::open(&config).context("opening task stores")?;

    run_stdio_bridge(Arc::new(tracker), Arc::new(SentenceSplitter))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "taskpet-host exited with error");
            anyhow::anyhow!("taskpet-host failed: {e}")
        })?;

    tracing::info!("taskpet-host shut down cleanly");
    Ok(())
}

/// Stderr logging, plus a daily-rolling file when enabled. The returned guard
/// flushes the file writer on drop.
fn init_tracing(
    logging: &LoggingConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .context("invalid logging filter")?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .boxed();

    let (file_layer, guard) = if logging.file_logging {
        let dir = taskpet_dirs::logs_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, "taskpet-host.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
