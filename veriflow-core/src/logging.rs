//! Logging setup: human-readable stderr plus JSON file logs.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{Result, VeriflowError};

/// Install the global subscriber: compact stderr output filtered by
/// `RUST_LOG` (default `info`) plus daily-rotated JSON files under
/// `log_dir`.
///
/// The returned guard must stay alive for the file writer to flush;
/// dropping it ends background logging.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let stderr_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(stderr_filter);

    let file_appender = tracing_appender::rolling::daily(log_dir, "veriflow.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| VeriflowError::Logging {
            message: e.to_string(),
        })?;

    Ok(guard)
}
