//! Error types for the CI watcher.

use std::time::Duration;

use thiserror::Error;

use crate::label::format_duration;
use crate::provider::ProviderError;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to list CI executions for {target}: {source}")]
    ListExecutions {
        target: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to list jobs for execution {execution_id}: {source}")]
    ListJobs {
        execution_id: u64,
        #[source]
        source: ProviderError,
    },

    #[error("CI did not finish within {}", display_elapsed(.elapsed))]
    Timeout { elapsed: Duration },
}

fn display_elapsed(elapsed: &Duration) -> String {
    format_duration(*elapsed)
}

impl WatchError {
    /// True for the distinguished "timed out waiting for CI" outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WatchError::Timeout { .. })
    }
}
