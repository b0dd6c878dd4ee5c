//! Hosting platform adapters for shipper.
//!
//! Maps GitHub and GitLab onto the two capabilities the rest of the tool
//! needs:
//! - [`CiProvider`](shipper_ci::CiProvider) for the CI watcher
//! - [`ReviewHost`] for opening and merging review requests
//!
//! [`Platform`] picks the adapter for a parsed git remote.

pub mod error;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod platform;
pub mod remote;
pub mod review;

pub use error::{PlatformError, Result};
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use platform::{HostSettings, Platform, PlatformKind};
pub use remote::{RemoteRepo, parse_remote};
pub use review::{MergeMethod, MergeOptions, NewReviewRequest, ReviewHost, ReviewRequest};
