//! Completion and conclusion aggregation over one fetch batch.

use crate::job::{Conclusion, Job, JobStatus};

/// False while any job in the batch is queued or running.
pub fn all_completed(jobs: &[Job]) -> bool {
    !jobs
        .iter()
        .any(|job| matches!(job.status, JobStatus::Queued | JobStatus::Running))
}

/// Overall conclusion of a completed batch.
///
/// Starts at [`Conclusion::Success`]; the first job in batch order whose
/// conclusion is not success, skipped or neutral decides the result, and
/// later jobs are ignored. This is first-non-clean-wins, not a severity
/// ranking. Jobs without a conclusion are not considered.
pub fn overall_conclusion(jobs: &[Job]) -> Conclusion {
    jobs.iter()
        .filter_map(|job| job.conclusion.as_ref())
        .find(|conclusion| !conclusion.is_clean())
        .cloned()
        .unwrap_or(Conclusion::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: u64, conclusion: Conclusion) -> Job {
        Job::new(id, format!("job-{id}"), JobStatus::Completed).with_conclusion(conclusion)
    }

    #[test]
    fn test_running_job_blocks_completion() {
        let jobs = vec![
            completed(1, Conclusion::Success),
            completed(2, Conclusion::Failure),
            Job::new(3, "job-3", JobStatus::Running),
        ];
        assert!(!all_completed(&jobs));

        let jobs = &jobs[..2];
        assert!(all_completed(jobs));
        assert_eq!(overall_conclusion(jobs), Conclusion::Failure);
    }

    #[test]
    fn test_queued_job_blocks_completion() {
        let jobs = vec![Job::new(1, "job-1", JobStatus::Queued)];
        assert!(!all_completed(&jobs));
    }

    #[test]
    fn test_first_non_clean_result_wins() {
        let jobs = vec![
            completed(1, Conclusion::Failure),
            completed(2, Conclusion::Cancelled),
        ];
        assert_eq!(overall_conclusion(&jobs), Conclusion::Failure);

        let reversed = vec![
            completed(2, Conclusion::Cancelled),
            completed(1, Conclusion::Failure),
        ];
        assert_eq!(overall_conclusion(&reversed), Conclusion::Cancelled);
    }

    #[test]
    fn test_clean_results_stay_successful() {
        let jobs = vec![
            completed(1, Conclusion::Success),
            completed(2, Conclusion::Skipped),
            completed(3, Conclusion::Neutral),
            Job::new(4, "job-4", JobStatus::Completed),
        ];
        assert_eq!(overall_conclusion(&jobs), Conclusion::Success);
    }
}
