//! Git remote URL parsing.
//!
//! Accepts the forms git hosts hand out:
//! - `git@host:owner/repo.git`
//! - `ssh://git@host[:port]/owner/repo.git`
//! - `https://[user[:token]@]host/owner/repo.git`
//!
//! GitLab nested groups (`group/subgroup/repo`) keep every leading segment
//! in the namespace.

use std::fmt;

use crate::error::{PlatformError, Result};

const SUPPORTED_SCHEMES: &[&str] = &["https", "http", "ssh", "git+ssh", "ssh+git", "git"];

/// Repository location parsed from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    /// Host name without user info or port.
    pub host: String,
    /// Owner, or group path for nested GitLab groups.
    pub namespace: String,
    pub name: String,
}

impl RemoteRepo {
    /// `namespace/name`.
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for RemoteRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.namespace, self.name)
    }
}

/// Parse a git remote URL.
pub fn parse_remote(url: &str) -> Result<RemoteRepo> {
    let url = url.trim();
    let invalid = || PlatformError::InvalidRemote(url.to_string());

    let (authority, path) = if let Some((scheme, rest)) = url.split_once("://") {
        if !SUPPORTED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return Err(invalid());
        }
        rest.split_once('/').ok_or_else(invalid)?
    } else {
        // scp-like syntax: [user@]host:path
        let (authority, path) = url.split_once(':').ok_or_else(invalid)?;
        if authority.contains('/') {
            return Err(invalid());
        }
        (authority, path)
    };

    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    let host = match host.split_once(':') {
        Some((name, _port)) => name,
        None => host,
    };
    if host.is_empty() {
        return Err(invalid());
    }

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 || segments.iter().any(|segment| segment.is_empty()) {
        return Err(invalid());
    }

    let (name, namespace) = segments.split_last().ok_or_else(invalid)?;
    Ok(RemoteRepo {
        host: host.to_ascii_lowercase(),
        namespace: namespace.join("/"),
        name: (*name).to_string(),
    })
}
