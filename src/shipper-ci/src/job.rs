//! CI job and execution records.
//!
//! Platform adapters translate their wire formats into these types. A job
//! whose identifier is missing on the wire deserializes to `0`, which the
//! tracker treats as an invalid entry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::Outcome;

/// Lifecycle state of a job or execution.
///
/// Platform states such as `pending`, `created` or `waiting` collapse into
/// [`JobStatus::Queued`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    Neutral,
    TimedOut,
    ActionRequired,
    /// Any other platform-specific terminal value, kept verbatim.
    Other(String),
}

impl Conclusion {
    /// Parse a platform conclusion string (case-insensitive).
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "passed" => Conclusion::Success,
            "failure" | "failed" => Conclusion::Failure,
            "cancelled" | "canceled" => Conclusion::Cancelled,
            "skipped" => Conclusion::Skipped,
            "neutral" => Conclusion::Neutral,
            "timed_out" => Conclusion::TimedOut,
            "action_required" => Conclusion::ActionRequired,
            other => Conclusion::Other(other.to_string()),
        }
    }

    /// Whether this conclusion lets the overall result stay successful.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            Conclusion::Success | Conclusion::Skipped | Conclusion::Neutral
        )
    }

    /// How a display indicator is finalized for this conclusion.
    pub fn outcome(&self) -> Outcome {
        match self {
            Conclusion::Success => Outcome::Positive,
            Conclusion::Skipped | Conclusion::Neutral => Outcome::Neutral,
            _ => Outcome::Negative,
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conclusion::Success => f.write_str("success"),
            Conclusion::Failure => f.write_str("failure"),
            Conclusion::Cancelled => f.write_str("cancelled"),
            Conclusion::Skipped => f.write_str("skipped"),
            Conclusion::Neutral => f.write_str("neutral"),
            Conclusion::TimedOut => f.write_str("timed_out"),
            Conclusion::ActionRequired => f.write_str("action_required"),
            Conclusion::Other(value) => f.write_str(value),
        }
    }
}

/// One unit of work within a CI execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Stable identifier, unique within its execution. `0` marks an invalid entry.
    #[serde(default)]
    pub id: u64,
    pub name: String,
    /// Workflow or stage name, used only for the display label.
    #[serde(default)]
    pub group: Option<String>,
    pub status: JobStatus,
    /// Only meaningful when `status` is [`JobStatus::Completed`].
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: u64, name: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id,
            name: name.into(),
            group: None,
            status,
            conclusion: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_conclusion(mut self, conclusion: Conclusion) -> Self {
        self.conclusion = Some(conclusion);
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.id != 0
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// The conclusion when completed, otherwise the status word.
    pub fn state_word(&self) -> String {
        match (&self.status, &self.conclusion) {
            (JobStatus::Completed, Some(conclusion)) => conclusion.to_string(),
            (status, _) => status.to_string(),
        }
    }

    /// `group/name`, or just `name` when the group is empty.
    pub fn display_name(&self) -> String {
        match self.group.as_deref() {
            Some(group) if !group.is_empty() => format!("{}/{}", group, self.name),
            _ => self.name.clone(),
        }
    }

    /// Finalization style for a completed job. A completed job without a
    /// conclusion is treated as neutral.
    pub fn outcome(&self) -> Outcome {
        self.conclusion
            .as_ref()
            .map(Conclusion::outcome)
            .unwrap_or(Outcome::Neutral)
    }
}

/// One CI run (a workflow run or a pipeline) associated with a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: u64,
    pub name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn new(id: u64, name: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id,
            name: name.into(),
            status,
            conclusion: None,
            started_at: None,
            updated_at: None,
        }
    }

    /// A synthetic job standing in for the whole execution.
    ///
    /// Its duration spans start to last update whenever both are known,
    /// whatever the execution's status.
    pub fn to_pseudo_job(&self) -> Job {
        let name = if self.name.trim().is_empty() {
            format!("execution #{}", self.id)
        } else {
            self.name.clone()
        };
        let completed_at = self.started_at.and(self.updated_at);

        Job {
            id: self.id,
            name,
            group: None,
            status: self.status,
            conclusion: self.conclusion.clone(),
            started_at: self.started_at,
            completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::label::compose_label;

    #[test]
    fn test_conclusion_parse() {
        assert_eq!(Conclusion::parse("SUCCESS"), Conclusion::Success);
        assert_eq!(Conclusion::parse("canceled"), Conclusion::Cancelled);
        assert_eq!(Conclusion::parse("failed"), Conclusion::Failure);
        assert_eq!(
            Conclusion::parse("stale"),
            Conclusion::Other("stale".to_string())
        );
    }

    #[test]
    fn test_conclusion_outcome() {
        assert_eq!(Conclusion::Success.outcome(), Outcome::Positive);
        assert_eq!(Conclusion::Skipped.outcome(), Outcome::Neutral);
        assert_eq!(Conclusion::Neutral.outcome(), Outcome::Neutral);
        assert_eq!(Conclusion::Cancelled.outcome(), Outcome::Negative);
        assert_eq!(
            Conclusion::Other("stale".into()).outcome(),
            Outcome::Negative
        );
    }

    #[test]
    fn test_state_word() {
        let running = Job::new(1, "build", JobStatus::Running);
        assert_eq!(running.state_word(), "running");

        let done = Job::new(1, "build", JobStatus::Completed).with_conclusion(Conclusion::Failure);
        assert_eq!(done.state_word(), "failure");
    }

    #[test]
    fn test_pseudo_job_duration_spans_start_to_update() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 30).unwrap();

        let mut execution = Execution::new(77, "", JobStatus::Queued);
        execution.started_at = Some(start);
        execution.updated_at = Some(updated);

        let job = execution.to_pseudo_job();
        assert_eq!(job.id, 77);
        assert_eq!(job.name, "execution #77");
        assert_eq!(job.completed_at, Some(updated));
        assert_eq!(compose_label(&job, Utc::now()), "execution #77 (queued, 30s)");

        execution.status = JobStatus::Running;
        let job = execution.to_pseudo_job();
        assert_eq!(compose_label(&job, Utc::now()), "execution #77 (running, 30s)");

        execution.started_at = None;
        assert_eq!(execution.to_pseudo_job().completed_at, None);
        execution.started_at = Some(start);

        execution.status = JobStatus::Completed;
        execution.conclusion = Some(Conclusion::Success);
        let job = execution.to_pseudo_job();
        assert_eq!(job.completed_at, Some(updated));
        assert_eq!(job.conclusion, Some(Conclusion::Success));
    }
}
