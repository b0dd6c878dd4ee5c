//! GitHub adapter.
//!
//! Workflow runs are executions and their jobs are the watched units.
//! Pull requests are the review requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::Deserialize;
use shipper_ci::{CiProvider, Conclusion, Execution, Job, JobPage, JobStatus, ProviderError};
use tracing::{debug, warn};

use crate::error::Result;
use crate::http::{create_client, ensure_success};
use crate::remote::RemoteRepo;
use crate::review::{MergeOptions, NewReviewRequest, ReviewHost, ReviewRequest};

const PLATFORM: &str = "GitHub";
const API_VERSION: &str = "2022-11-28";
const JOBS_PER_PAGE: u32 = 100;

/// API root for a GitHub host. Enterprise servers serve it under `/api/v3`.
pub fn default_api_url(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{host}/api/v3")
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    repo: RemoteRepo,
    base_url: String,
}

impl GitHubClient {
    pub fn new(repo: RemoteRepo, token: impl Into<String>, api_url: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            token: token.into(),
            repo,
            base_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn repo(&self) -> &RemoteRepo {
        &self.repo
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_url, self.repo.namespace, self.repo.name, path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Number of workflows defined in the repository.
    pub async fn workflow_count(&self) -> Result<u64> {
        let request = self
            .client
            .get(self.repo_url("actions/workflows"))
            .query(&[("per_page", "1")]);
        let response = self.authorized(request).send().await?;
        let list: WorkflowList = ensure_success(PLATFORM, response).await?.json().await?;
        Ok(list.total_count)
    }

    /// Workflow runs triggered for a commit.
    pub async fn workflow_runs(&self, head_sha: &str) -> Result<Vec<WorkflowRun>> {
        let request = self
            .client
            .get(self.repo_url("actions/runs"))
            .query(&[("head_sha", head_sha), ("per_page", "100")]);
        let response = self.authorized(request).send().await?;
        let list: RunList = ensure_success(PLATFORM, response).await?.json().await?;
        debug!(
            commit = head_sha,
            total = list.total_count,
            "Fetched workflow runs"
        );
        Ok(list.workflow_runs)
    }

    /// One page of a workflow run's jobs, plus the total job count.
    pub async fn run_jobs(&self, run_id: u64, page: u32) -> Result<(Vec<WorkflowJob>, u64)> {
        let request = self
            .client
            .get(self.repo_url(&format!("actions/runs/{run_id}/jobs")))
            .query(&[("per_page", JOBS_PER_PAGE), ("page", page)]);
        let response = self.authorized(request).send().await?;
        let list: JobList = ensure_success(PLATFORM, response).await?.json().await?;
        Ok((list.jobs, list.total_count))
    }

    pub async fn create_pull_request(&self, request: &NewReviewRequest) -> Result<PullRequest> {
        let payload = serde_json::json!({
            "title": request.title,
            "body": request.body,
            "head": request.source_branch,
            "base": request.target_branch,
            "draft": request.draft,
        });
        let response = self
            .authorized(self.client.post(self.repo_url("pulls")))
            .json(&payload)
            .send()
            .await?;
        let pr: PullRequest = ensure_success(PLATFORM, response).await?.json().await?;
        debug!(number = pr.number, url = %pr.html_url, "Created pull request");
        Ok(pr)
    }

    pub async fn merge_pull_request(
        &self,
        number: u64,
        head_sha: &str,
        options: &MergeOptions,
    ) -> Result<()> {
        let mut payload = serde_json::json!({
            "merge_method": options.method.as_str(),
            "sha": head_sha,
        });
        if let Some(title) = &options.commit_title {
            payload["commit_title"] = serde_json::Value::String(title.clone());
        }
        if let Some(message) = &options.commit_message {
            payload["commit_message"] = serde_json::Value::String(message.clone());
        }

        let response = self
            .authorized(self.client.put(self.repo_url(&format!("pulls/{number}/merge"))))
            .json(&payload)
            .send()
            .await?;
        ensure_success(PLATFORM, response).await?;
        debug!(number, method = %options.method, "Merged pull request");
        Ok(())
    }

    pub async fn delete_branch(&self, branch: &str) -> Result<()> {
        let url = self.repo_url(&format!("git/refs/heads/{branch}"));
        let response = self.authorized(self.client.delete(url)).send().await?;
        ensure_success(PLATFORM, response).await?;
        Ok(())
    }
}

#[async_trait]
impl CiProvider for GitHubClient {
    async fn has_ci(&self, _target: &str) -> std::result::Result<bool, ProviderError> {
        Ok(self.workflow_count().await? > 0)
    }

    async fn list_executions(
        &self,
        target: &str,
    ) -> std::result::Result<Vec<Execution>, ProviderError> {
        let runs = self.workflow_runs(target).await?;
        Ok(runs.into_iter().map(WorkflowRun::into_execution).collect())
    }

    async fn list_jobs(
        &self,
        execution_id: u64,
        page: u32,
    ) -> std::result::Result<JobPage, ProviderError> {
        let (jobs, total) = self.run_jobs(execution_id, page).await?;
        let has_more = !jobs.is_empty() && u64::from(page) * u64::from(JOBS_PER_PAGE) < total;
        Ok(JobPage {
            jobs: jobs.into_iter().map(WorkflowJob::into_job).collect(),
            has_more,
        })
    }
}

#[async_trait]
impl ReviewHost for GitHubClient {
    async fn create_request(&self, request: &NewReviewRequest) -> Result<ReviewRequest> {
        let pr = self.create_pull_request(request).await?;
        Ok(ReviewRequest {
            number: pr.number,
            url: pr.html_url,
            head_sha: pr.head.sha,
            source_branch: pr.head.ref_name,
        })
    }

    async fn merge_request(&self, request: &ReviewRequest, options: &MergeOptions) -> Result<()> {
        self.merge_pull_request(request.number, &request.head_sha, options)
            .await?;

        if options.delete_branch {
            // Merge has landed; deletion failures are only logged.
            if let Err(err) = self.delete_branch(&request.source_branch).await {
                warn!(branch = %request.source_branch, error = %err, "Failed to delete source branch");
            }
        }
        Ok(())
    }
}

/// Map a GitHub run or job status onto the common lifecycle.
fn map_status(status: Option<&str>) -> JobStatus {
    match status {
        Some("in_progress") => JobStatus::Running,
        Some("completed") => JobStatus::Completed,
        _ => JobStatus::Queued,
    }
}

fn map_conclusion(status: JobStatus, conclusion: Option<&str>) -> Option<Conclusion> {
    match status {
        JobStatus::Completed => conclusion.map(Conclusion::parse),
        _ => None,
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorkflowList {
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct RunList {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    fn into_execution(self) -> Execution {
        let status = map_status(self.status.as_deref());
        Execution {
            id: self.id,
            name: self.name.unwrap_or_default(),
            status,
            conclusion: map_conclusion(status, self.conclusion.as_deref()),
            started_at: self.run_started_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobList {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    jobs: Vec<WorkflowJob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowJob {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowJob {
    fn into_job(self) -> Job {
        let status = map_status(self.status.as_deref());
        Job {
            id: self.id,
            name: self.name,
            group: self.workflow_name.filter(|name| !name.is_empty()),
            status,
            conclusion: map_conclusion(status, self.conclusion.as_deref()),
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
}
