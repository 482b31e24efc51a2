//! Shared logging setup for the Vigil binary.
//!
//! Two layers: an env-filtered stderr layer for the operator and a plain
//! file layer under the Vigil home directory. The file is size-checked
//! and rotated once at startup (renamed to `<app>.log.1`), not midstream;
//! the agent's volume is a handful of lines per artifact.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str =
    "vigil=info,vigil_tracker=info,vigil_vision=info,vigil_sinks=info";
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration for the binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with a file writer and stderr output. Call once.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file = open_rotated_log(&log_dir, config.app_name)
        .context("Failed to open log file")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    Ok(())
}

/// The Vigil home directory: `$VIGIL_HOME` or `~/.vigil_flow`.
pub fn vigil_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("VIGIL_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|h| h.join(".vigil_flow"))
        .unwrap_or_else(|| PathBuf::from(".vigil_flow"))
}

/// The logs directory: `<home>/logs`.
pub fn logs_dir() -> PathBuf {
    vigil_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Open `<dir>/<app>.log` for appending, shifting an oversized file to
/// `<app>.log.1` first (replacing any previous rotation).
fn open_rotated_log(dir: &PathBuf, app_name: &str) -> std::io::Result<File> {
    let current = dir.join(format!("{}.log", sanitize_name(app_name)));
    if let Ok(meta) = fs::metadata(&current) {
        if meta.len() > MAX_LOG_FILE_SIZE {
            let rotated = dir.join(format!("{}.log.1", sanitize_name(app_name)));
            fs::rename(&current, &rotated)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(&current)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
