//! Top-level wait loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::{all_completed, overall_conclusion};
use crate::display::{DisplaySink, Outcome};
use crate::error::{Result, WatchError};
use crate::fetcher::JobFetcher;
use crate::job::Conclusion;
use crate::label::format_duration;
use crate::provider::CiProvider;
use crate::tracker::{StateTracker, TrackerOptions};

/// Sleep between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cadence settings for one watcher.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub tracker: TrackerOptions,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            tracker: TrackerOptions::default(),
        }
    }
}

/// Waits for the CI executions of a commit to finish.
pub struct CompletionPoller<P: CiProvider + ?Sized> {
    provider: Arc<P>,
    sink: Arc<dyn DisplaySink>,
    options: WatchOptions,
}

impl<P: CiProvider + ?Sized> CompletionPoller<P> {
    pub fn new(provider: Arc<P>, sink: Arc<dyn DisplaySink>) -> Self {
        Self::with_options(provider, sink, WatchOptions::default())
    }

    pub fn with_options(
        provider: Arc<P>,
        sink: Arc<dyn DisplaySink>,
        options: WatchOptions,
    ) -> Self {
        Self {
            provider,
            sink,
            options,
        }
    }

    /// Poll until every job of `target` completes or `timeout` elapses.
    ///
    /// Returns the overall conclusion, [`Conclusion::Success`] immediately
    /// when the target has no CI at all, or [`WatchError::Timeout`]. Time is
    /// only checked between cycles, so an in-flight fetch may overrun the
    /// timeout by one cycle.
    pub async fn wait(&self, target: &str, timeout: Duration) -> Result<Conclusion> {
        match self.provider.has_ci(target).await {
            Ok(false) => {
                info!(commit = target, "No CI configured, nothing to wait for");
                return Ok(Conclusion::Success);
            }
            Ok(true) => {}
            Err(err) => {
                warn!(
                    commit = target,
                    error = %err,
                    "CI existence check failed, assuming CI exists"
                );
            }
        }

        let tracker =
            StateTracker::with_options(self.sink.clone(), self.options.tracker.clone());
        let fetcher = JobFetcher::new(self.provider.as_ref());
        let start = Instant::now();
        let mut cycle = 0u64;

        while start.elapsed() < timeout {
            cycle += 1;
            let executions = self
                .provider
                .list_executions(target)
                .await
                .map_err(|source| WatchError::ListExecutions {
                    target: target.to_string(),
                    source,
                })?;

            if executions.is_empty() {
                debug!(commit = target, cycle, "No CI executions scheduled yet");
                tokio::time::sleep(self.options.poll_interval).await;
                continue;
            }

            let batch = fetcher.fetch(&executions).await;
            for transition in tracker.update(&batch) {
                debug!(commit = target, cycle, "{}", transition);
            }

            if !all_completed(&batch) {
                tokio::time::sleep(self.options.poll_interval).await;
                continue;
            }

            let conclusion = overall_conclusion(&batch);
            let elapsed = format_duration(start.elapsed());
            if conclusion == Conclusion::Success {
                self.sink
                    .summary(Outcome::Positive, &format!("CI passed in {}", elapsed));
            } else {
                self.sink.summary(
                    Outcome::Negative,
                    &format!("CI failed ({}) in {}", conclusion, elapsed),
                );
            }
            info!(commit = target, %conclusion, cycles = cycle, "CI finished");
            return Ok(conclusion);
        }

        let elapsed = start.elapsed();
        self.sink.summary(
            Outcome::Negative,
            &format!("CI timed out after {}", format_duration(elapsed)),
        );
        warn!(commit = target, cycles = cycle, "Timed out waiting for CI");
        Err(WatchError::Timeout { elapsed })
    }
}
