//! Label and duration formatting for job indicators.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::job::Job;

/// Format a duration rounded to the nearest second.
///
/// Renders `"{m}m {s}s"` when at least one minute has passed, else `"{s}s"`.
/// Hours accumulate into the minute count.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = (duration.as_millis() + 500) / 1000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Signed chrono difference clamped at zero so clock skew never goes negative.
fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or(Duration::ZERO)
}

/// Duration shown next to a job.
///
/// `completed_at - started_at` when both are known, else elapsed time for a
/// running job with a known start, else nothing.
pub fn job_duration(job: &Job, now: DateTime<Utc>) -> Option<Duration> {
    match (job.started_at, job.completed_at) {
        (Some(start), Some(end)) => Some(between(start, end)),
        (Some(start), None) if job.is_running() => Some(between(start, now)),
        _ => None,
    }
}

/// `"<group/>name (<state>[, <duration>])"`.
pub fn compose_label(job: &Job, now: DateTime<Utc>) -> String {
    let name = job.display_name();
    let state = job.state_word();
    match job_duration(job, now) {
        Some(duration) => format!("{} ({}, {})", name, state, format_duration(duration)),
        None => format!("{} ({})", name, state),
    }
}
