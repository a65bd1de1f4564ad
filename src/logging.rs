//! Tracing configuration and log routing.
//!
//! Human-readable logs go to stderr so `mindgap ask` keeps stdout for its results. A second,
//! non-blocking layer appends plain-text events to `MINDGAP_LOG_FILE`, or `logs/mindgap.log`
//! when the variable is unset or blank.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILE: &str = "logs/mindgap.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the stderr and file subscribers.
///
/// `RUST_LOG` controls filtering and defaults to `info`. Later calls keep the first subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let path = log_file_path(std::env::var("MINDGAP_LOG_FILE").ok());
    let file_layer = open_log_writer(&path).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = result {
        eprintln!("Tracing already initialized: {err}");
    }
}

/// Resolve the log file location from an optional override.
fn log_file_path(configured: Option<String>) -> PathBuf {
    configured
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from)
}

/// Open `path` for appending, creating its parent directory, and wrap it in a non-blocking
/// writer. Returns `None` (stderr-only logging) when the file cannot be opened.
fn open_log_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
