//! One handle over both hosting platforms.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shipper_ci::{CiProvider, Execution, JobPage, ProviderError};
use tracing::debug;

use crate::error::{PlatformError, Result};
use crate::github::{self, GitHubClient};
use crate::gitlab::{self, GitLabClient};
use crate::remote::RemoteRepo;
use crate::review::{MergeOptions, NewReviewRequest, ReviewHost, ReviewRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    GitHub,
    GitLab,
}

impl PlatformKind {
    /// Guess the platform from a host name.
    pub fn infer(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host == "github.com" || host.ends_with(".github.com") {
            Some(PlatformKind::GitHub)
        } else if host.contains("gitlab") {
            Some(PlatformKind::GitLab)
        } else {
            None
        }
    }

    pub fn default_api_url(&self, host: &str) -> String {
        match self {
            PlatformKind::GitHub => github::default_api_url(host),
            PlatformKind::GitLab => gitlab::default_api_url(host),
        }
    }

    /// What the platform calls a review request.
    pub fn request_noun(&self) -> &'static str {
        match self {
            PlatformKind::GitHub => "pull request",
            PlatformKind::GitLab => "merge request",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::GitHub => f.write_str("GitHub"),
            PlatformKind::GitLab => f.write_str("GitLab"),
        }
    }
}

/// Resolved connection settings for one host.
#[derive(Debug, Clone, Default)]
pub struct HostSettings {
    /// Overrides host-name inference.
    pub kind: Option<PlatformKind>,
    pub api_url: Option<String>,
    pub token: Option<String>,
}

pub enum Platform {
    GitHub(GitHubClient),
    GitLab(GitLabClient),
}

impl Platform {
    pub fn connect(remote: RemoteRepo, settings: &HostSettings) -> Result<Self> {
        let kind = match settings.kind {
            Some(kind) => kind,
            None => PlatformKind::infer(&remote.host)
                .ok_or_else(|| PlatformError::UnsupportedHost(remote.host.clone()))?,
        };
        let token = settings
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| PlatformError::MissingToken {
                host: remote.host.clone(),
            })?;
        let api_url = settings
            .api_url
            .clone()
            .unwrap_or_else(|| kind.default_api_url(&remote.host));

        debug!(%kind, %api_url, repo = %remote, "Connecting to platform");
        Ok(match kind {
            PlatformKind::GitHub => Platform::GitHub(GitHubClient::new(remote, token, &api_url)?),
            PlatformKind::GitLab => Platform::GitLab(GitLabClient::new(remote, token, &api_url)?),
        })
    }

    pub fn kind(&self) -> PlatformKind {
        match self {
            Platform::GitHub(_) => PlatformKind::GitHub,
            Platform::GitLab(_) => PlatformKind::GitLab,
        }
    }

    pub fn repo(&self) -> &RemoteRepo {
        match self {
            Platform::GitHub(client) => client.repo(),
            Platform::GitLab(client) => client.repo(),
        }
    }

    pub fn api_url(&self) -> &str {
        match self {
            Platform::GitHub(client) => client.base_url(),
            Platform::GitLab(client) => client.base_url(),
        }
    }

    fn provider(&self) -> &dyn CiProvider {
        match self {
            Platform::GitHub(client) => client,
            Platform::GitLab(client) => client,
        }
    }

    fn review_host(&self) -> &dyn ReviewHost {
        match self {
            Platform::GitHub(client) => client,
            Platform::GitLab(client) => client,
        }
    }
}

#[async_trait]
impl CiProvider for Platform {
    async fn has_ci(&self, target: &str) -> std::result::Result<bool, ProviderError> {
        self.provider().has_ci(target).await
    }

    async fn list_executions(
        &self,
        target: &str,
    ) -> std::result::Result<Vec<Execution>, ProviderError> {
        self.provider().list_executions(target).await
    }

    async fn list_jobs(
        &self,
        execution_id: u64,
        page: u32,
    ) -> std::result::Result<JobPage, ProviderError> {
        self.provider().list_jobs(execution_id, page).await
    }
}

#[async_trait]
impl ReviewHost for Platform {
    async fn create_request(&self, request: &NewReviewRequest) -> Result<ReviewRequest> {
        self.review_host().create_request(request).await
    }

    async fn merge_request(&self, request: &ReviewRequest, options: &MergeOptions) -> Result<()> {
        self.review_host().merge_request(request, options).await
    }
}
