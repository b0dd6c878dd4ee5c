//! CI provider capability implemented by the platform adapters.

use async_trait::async_trait;

use crate::job::{Execution, Job};

/// Error type returned by provider implementations.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// One page of a paginated job listing.
#[derive(Debug, Clone, Default)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub has_more: bool,
}

#[async_trait]
pub trait CiProvider: Send + Sync {
    /// Whether any CI execution is, or will be, associated with `target`.
    ///
    /// `Ok(false)` is a definitive "no CI configured".
    async fn has_ci(&self, target: &str) -> Result<bool, ProviderError>;

    /// Executions (workflow runs or pipelines) for a commit.
    async fn list_executions(&self, target: &str) -> Result<Vec<Execution>, ProviderError>;

    /// Jobs of one execution. `page` starts at 1.
    async fn list_jobs(&self, execution_id: u64, page: u32) -> Result<JobPage, ProviderError>;
}
