//! Tracing subscriber setup: console output plus an optional per-run log file.

use crate::config::LogSettings;
use crate::error::{CliError, Result};
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name of the log for a run started now.
pub fn run_log_name() -> String {
    format!("mrclean-{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. When file logging
/// is enabled the returned guard must be held until exit so buffered lines
/// are flushed.
pub fn init(settings: &LogSettings, directory: &Path) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| CliError::Logging(format!("invalid level '{}': {}", settings.level, e)))?;

    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if !settings.enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
            .map_err(|e| CliError::Logging(e.to_string()))?;
        return Ok(None);
    }

    let name = run_log_name();
    ensure_directory(directory)?;
    let appender = tracing_appender::rolling::never(directory, &name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    tracing::debug!("Logging to {}", directory.join(&name).display());
    Ok(Some(guard))
}

fn ensure_directory(directory: &Path) -> Result<()> {
    if !directory.exists() {
        eprintln!("Log directory {} not found, creating it", directory.display());
        fs::create_dir_all(directory)?;
    }
    Ok(())
}
