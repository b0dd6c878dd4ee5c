//! Tracing setup.
//!
//! Logs default to `warn` so they stay out of the way of the live display.
//! `--verbose`/`--trace` raise the level for shipper's crates, `SHIPPER_LOG`
//! and then `RUST_LOG` take a full filter directive, and `--log-file` moves
//! everything into a file.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::LogLevel;

/// Environment variable with a filter directive, e.g. `shipper_ci=debug`.
pub const LOG_ENV: &str = "SHIPPER_LOG";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct LogGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Resolve the filter directive to use.
pub fn filter_directive(forced: Option<LogLevel>) -> String {
    if let Some(level) = forced {
        return level.crate_filter();
    }
    for var in [LOG_ENV, "RUST_LOG"] {
        if let Ok(value) = std::env::var(var) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            // A bare level applies to shipper's crates only.
            return match LogLevel::from_str_loose(value) {
                Some(level) => level.crate_filter(),
                None => value.to_string(),
            };
        }
    }
    LogLevel::default().crate_filter()
}

/// Install the global subscriber.
pub fn init(forced: Option<LogLevel>, log_file: Option<&Path>) -> Result<LogGuard> {
    let directive = filter_directive(forced);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter '{directive}'"))?;

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;
        return Ok(LogGuard { _guard: None });
    };

    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    Ok(LogGuard {
        _guard: Some(guard),
    })
}
