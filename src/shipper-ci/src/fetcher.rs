//! Concurrent job retrieval for a set of CI executions.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::WatchError;
use crate::job::{Execution, Job};
use crate::provider::CiProvider;

/// Upper bound on pages read for one execution, guarding against a provider
/// that keeps reporting more pages.
const MAX_PAGES: u32 = 100;

/// Fetches the job lists of all executions of one target.
pub struct JobFetcher<'a, P: CiProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: CiProvider + ?Sized> JobFetcher<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Fetch every execution's jobs concurrently.
    ///
    /// An execution whose listing fails is represented by a pseudo-job. When
    /// no execution reports any real job, every execution becomes a
    /// pseudo-job so the display is never empty.
    pub async fn fetch(&self, executions: &[Execution]) -> Vec<Job> {
        let results = join_all(
            executions
                .iter()
                .map(|execution| self.fetch_execution(execution)),
        )
        .await;

        let real_count: usize = results
            .iter()
            .map(|result| result.as_ref().map_or(0, Vec::len))
            .sum();
        if real_count == 0 {
            debug!(
                executions = executions.len(),
                "No job-level detail yet, showing executions"
            );
            return executions.iter().map(Execution::to_pseudo_job).collect();
        }

        let mut jobs = Vec::with_capacity(real_count);
        for (execution, result) in executions.iter().zip(results) {
            match result {
                Ok(execution_jobs) => jobs.extend(execution_jobs),
                Err(err) => {
                    warn!(error = %err, "Falling back to execution-level status");
                    jobs.push(execution.to_pseudo_job());
                }
            }
        }
        jobs
    }

    /// Read every page of one execution's jobs.
    async fn fetch_execution(&self, execution: &Execution) -> Result<Vec<Job>, WatchError> {
        let mut jobs = Vec::new();
        let mut page = 1;
        loop {
            let listing = self
                .provider
                .list_jobs(execution.id, page)
                .await
                .map_err(|source| WatchError::ListJobs {
                    execution_id: execution.id,
                    source,
                })?;
            jobs.extend(listing.jobs);

            if !listing.has_more {
                break;
            }
            if page >= MAX_PAGES {
                warn!(
                    execution_id = execution.id,
                    pages = page,
                    "Stopping job pagination at page limit"
                );
                break;
            }
            page += 1;
        }
        Ok(jobs)
    }
}
