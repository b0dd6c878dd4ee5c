//! CI completion watcher.
//!
//! Waits for the CI executions attached to a commit to finish while keeping
//! a live display of every job:
//! - [`CompletionPoller`] - existence check, poll cycles, timeout, final verdict
//! - [`JobFetcher`] - concurrent per-execution job listing with pseudo-job fallback
//! - [`StateTracker`] - last-known job state and the indicator bound to each job
//! - [`aggregate`] - completion check and conclusion aggregation
//!
//! Platform access comes in through [`CiProvider`] and rendering goes out
//! through [`DisplaySink`]; neither is implemented here.

pub mod aggregate;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod label;
pub mod poller;
pub mod provider;
pub mod tracker;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use aggregate::{all_completed, overall_conclusion};
pub use display::{AnimatedIndicator, DisplaySink, Outcome, StaticLine};
pub use error::{Result, WatchError};
pub use fetcher::JobFetcher;
pub use job::{Conclusion, Execution, Job, JobStatus};
pub use label::{compose_label, format_duration};
pub use poller::{CompletionPoller, DEFAULT_POLL_INTERVAL, WatchOptions};
pub use provider::{CiProvider, JobPage, ProviderError};
pub use tracker::{DEFAULT_REFRESH_INTERVAL, IndicatorKind, StateTracker, TrackerOptions};
