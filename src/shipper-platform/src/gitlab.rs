//! GitLab adapter.
//!
//! Pipelines are executions, pipeline jobs are the watched units and a
//! job's stage is its group. Merge requests are the review requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use shipper_ci::{CiProvider, Conclusion, Execution, Job, JobPage, JobStatus, ProviderError};
use tracing::debug;

use crate::error::{PlatformError, Result};
use crate::http::{create_client, ensure_success};
use crate::remote::RemoteRepo;
use crate::review::{MergeMethod, MergeOptions, NewReviewRequest, ReviewHost, ReviewRequest};

const PLATFORM: &str = "GitLab";
const CI_CONFIG_FILE: &str = ".gitlab-ci.yml";
const JOBS_PER_PAGE: u32 = 100;

/// API root for a GitLab host.
pub fn default_api_url(host: &str) -> String {
    format!("https://{host}/api/v4")
}

pub struct GitLabClient {
    client: reqwest::Client,
    token: String,
    repo: RemoteRepo,
    base_url: String,
}

impl GitLabClient {
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

    /// Project endpoints address the project by its url-encoded full path.
    fn project_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.base_url,
            urlencoding::encode(&self.repo.full_path()),
            path
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("PRIVATE-TOKEN", &self.token)
    }

    /// Whether the commit carries a CI configuration file.
    pub async fn has_ci_config(&self, sha: &str) -> Result<bool> {
        let request = self
            .client
            .get(self.project_url(&format!("repository/files/{CI_CONFIG_FILE}")))
            .query(&[("ref", sha)]);
        let response = self.authorized(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(PLATFORM, response).await?;
        Ok(true)
    }

    pub async fn pipelines(&self, sha: &str) -> Result<Vec<Pipeline>> {
        let request = self
            .client
            .get(self.project_url("pipelines"))
            .query(&[("sha", sha), ("per_page", "100")]);
        let response = self.authorized(request).send().await?;
        let pipelines: Vec<Pipeline> = ensure_success(PLATFORM, response).await?.json().await?;
        debug!(commit = sha, total = pipelines.len(), "Fetched pipelines");
        Ok(pipelines)
    }

    /// One page of a pipeline's jobs and whether another page follows.
    pub async fn pipeline_jobs(&self, pipeline_id: u64, page: u32) -> Result<(Vec<PipelineJob>, bool)> {
        let request = self
            .client
            .get(self.project_url(&format!("pipelines/{pipeline_id}/jobs")))
            .query(&[("per_page", JOBS_PER_PAGE), ("page", page)]);
        let response = ensure_success(PLATFORM, self.authorized(request).send().await?).await?;
        let has_more = response
            .headers()
            .get("x-next-page")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| !value.trim().is_empty());
        let jobs: Vec<PipelineJob> = response.json().await?;
        Ok((jobs, has_more))
    }

    pub async fn create_merge_request(&self, request: &NewReviewRequest) -> Result<MergeRequest> {
        let title = if request.draft {
            format!("Draft: {}", request.title)
        } else {
            request.title.clone()
        };
        let payload = serde_json::json!({
            "source_branch": request.source_branch,
            "target_branch": request.target_branch,
            "title": title,
            "description": request.body,
        });
        let response = self
            .authorized(self.client.post(self.project_url("merge_requests")))
            .json(&payload)
            .send()
            .await?;
        let mr: MergeRequest = ensure_success(PLATFORM, response).await?.json().await?;
        debug!(iid = mr.iid, url = %mr.web_url, "Created merge request");
        Ok(mr)
    }

    pub async fn accept_merge_request(
        &self,
        iid: u64,
        head_sha: &str,
        options: &MergeOptions,
    ) -> Result<()> {
        let squash = match options.method {
            MergeMethod::Squash => true,
            MergeMethod::Merge => false,
            MergeMethod::Rebase => {
                return Err(PlatformError::Unsupported(
                    "GitLab merge requests cannot be merged with the rebase method".to_string(),
                ));
            }
        };

        let mut payload = serde_json::json!({
            "squash": squash,
            "should_remove_source_branch": options.delete_branch,
        });
        if !head_sha.is_empty() {
            payload["sha"] = serde_json::Value::String(head_sha.to_string());
        }
        if let Some(message) = commit_message(options) {
            let key = if squash {
                "squash_commit_message"
            } else {
                "merge_commit_message"
            };
            payload[key] = serde_json::Value::String(message);
        }

        let response = self
            .authorized(
                self.client
                    .put(self.project_url(&format!("merge_requests/{iid}/merge"))),
            )
            .json(&payload)
            .send()
            .await?;
        ensure_success(PLATFORM, response).await?;
        debug!(iid, method = %options.method, "Merged merge request");
        Ok(())
    }
}

/// GitLab takes a single message; the title becomes its first line.
fn commit_message(options: &MergeOptions) -> Option<String> {
    match (&options.commit_title, &options.commit_message) {
        (Some(title), Some(body)) if !body.is_empty() => Some(format!("{title}\n\n{body}")),
        (Some(title), _) => Some(title.clone()),
        (None, Some(body)) => Some(body.clone()),
        (None, None) => None,
    }
}

#[async_trait]
impl CiProvider for GitLabClient {
    async fn has_ci(&self, target: &str) -> std::result::Result<bool, ProviderError> {
        Ok(self.has_ci_config(target).await?)
    }

    async fn list_executions(
        &self,
        target: &str,
    ) -> std::result::Result<Vec<Execution>, ProviderError> {
        let pipelines = self.pipelines(target).await?;
        Ok(pipelines.into_iter().map(Pipeline::into_execution).collect())
    }

    async fn list_jobs(
        &self,
        execution_id: u64,
        page: u32,
    ) -> std::result::Result<JobPage, ProviderError> {
        let (jobs, has_more) = self.pipeline_jobs(execution_id, page).await?;
        Ok(JobPage {
            jobs: jobs.into_iter().map(PipelineJob::into_job).collect(),
            has_more,
        })
    }
}

#[async_trait]
impl ReviewHost for GitLabClient {
    async fn create_request(&self, request: &NewReviewRequest) -> Result<ReviewRequest> {
        let mr = self.create_merge_request(request).await?;
        Ok(ReviewRequest {
            number: mr.iid,
            url: mr.web_url,
            head_sha: mr.sha.unwrap_or_default(),
            source_branch: mr.source_branch,
        })
    }

    async fn merge_request(&self, request: &ReviewRequest, options: &MergeOptions) -> Result<()> {
        self.accept_merge_request(request.number, &request.head_sha, options)
            .await
    }
}

/// Map a GitLab pipeline or job status onto the common lifecycle.
///
/// `manual` jobs wait for a human and never finish on their own, so they
/// count as skipped.
fn map_status(status: &str) -> (JobStatus, Option<Conclusion>) {
    match status {
        "running" => (JobStatus::Running, None),
        "success" => (JobStatus::Completed, Some(Conclusion::Success)),
        "failed" => (JobStatus::Completed, Some(Conclusion::Failure)),
        "canceled" | "canceling" => (JobStatus::Completed, Some(Conclusion::Cancelled)),
        "skipped" | "manual" => (JobStatus::Completed, Some(Conclusion::Skipped)),
        // created, pending, waiting_for_resource, preparing, scheduled
        _ => (JobStatus::Queued, None),
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "ref")]
    pub ref_name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    fn into_execution(self) -> Execution {
        let (status, conclusion) = map_status(&self.status);
        let name = self
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("pipeline #{}", self.id));
        Execution {
            id: self.id,
            name,
            status,
            conclusion,
            started_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineJob {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stage: Option<String>,
    pub status: String,
    #[serde(default)]
    pub allow_failure: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineJob {
    fn into_job(self) -> Job {
        let (status, mut conclusion) = map_status(&self.status);
        // Allowed failures do not fail the pipeline.
        if self.allow_failure && conclusion == Some(Conclusion::Failure) {
            conclusion = Some(Conclusion::Neutral);
        }
        Job {
            id: self.id,
            name: self.name,
            group: self.stage.filter(|stage| !stage.is_empty()),
            status,
            conclusion,
            started_at: self.started_at,
            completed_at: self.finished_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub iid: u64,
    pub web_url: String,
    #[serde(default)]
    pub sha: Option<String>,
    pub source_branch: String,
}
