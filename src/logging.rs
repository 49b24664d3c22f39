//! Logging setup
//!
//! The terminal belongs to the TUI, so log lines go to `steamroll.log` in the
//! platform data directory. Verbosity comes from `RUST_LOG` and defaults to `info`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "steamroll.log";

/// Platform data directory for the log file (`~/.local/share/steamroll` on Linux)
pub fn default_log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "steamroll").map(|dirs| dirs.data_local_dir().to_path_buf())
}

/// Initialize file logging under `log_dir`
///
/// The returned guard flushes pending lines when dropped; keep it alive for the
/// program lifetime. Returns `None` when the directory cannot be created or a
/// subscriber is already installed, in which case logging is silently off.
pub fn init_file_logging(log_dir: &Path) -> Option<WorkerGuard> {
    std::fs::create_dir_all(log_dir).ok()?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter),
        )
        .try_init()
        .ok()?;

    Some(guard)
}
