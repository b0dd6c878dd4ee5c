//! Review request (pull request / merge request) capability.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a review request is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            other => Err(format!(
                "unknown merge method '{other}' (expected merge, squash or rebase)"
            )),
        }
    }
}

/// Parameters for opening a review request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReviewRequest {
    pub title: String,
    pub body: String,
    pub source_branch: String,
    pub target_branch: String,
    pub draft: bool,
}

/// An opened review request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// PR number or MR iid.
    pub number: u64,
    pub url: String,
    /// Commit whose CI gates the merge.
    pub head_sha: String,
    pub source_branch: String,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    pub method: MergeMethod,
    pub delete_branch: bool,
    pub commit_title: Option<String>,
    pub commit_message: Option<String>,
}

#[async_trait]
pub trait ReviewHost: Send + Sync {
    async fn create_request(&self, request: &NewReviewRequest) -> Result<ReviewRequest>;

    async fn merge_request(&self, request: &ReviewRequest, options: &MergeOptions) -> Result<()>;
}
