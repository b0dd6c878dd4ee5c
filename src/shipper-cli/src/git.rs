//! Local git operations.
//!
//! Every call runs `git` with arguments passed separately, never through a
//! shell.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::debug;

/// Remote the tool pushes to and reads the hosting platform from.
pub const DEFAULT_REMOTE: &str = "origin";

/// Fallback target branch when the remote HEAD is unknown.
pub const FALLBACK_BASE: &str = "main";

/// Run `git` in `dir` and return its trimmed stdout.
pub async fn git(dir: &Path, args: &[&str]) -> Result<String> {
    debug!(?args, dir = %dir.display(), "Running git");
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Top-level directory of the repository containing `dir`.
pub async fn repo_root(dir: &Path) -> Result<PathBuf> {
    let root = git(dir, &["rev-parse", "--show-toplevel"])
        .await
        .context("Not inside a git repository")?;
    Ok(PathBuf::from(root))
}

pub async fn remote_url(root: &Path, remote: &str) -> Result<String> {
    git(root, &["remote", "get-url", remote])
        .await
        .with_context(|| format!("No '{remote}' remote configured"))
}

/// Checked-out branch. A detached HEAD is an error.
pub async fn current_branch(root: &Path) -> Result<String> {
    let branch = git(root, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    if branch == "HEAD" {
        bail!("HEAD is detached; check out a branch first");
    }
    Ok(branch)
}

pub async fn head_sha(root: &Path) -> Result<String> {
    git(root, &["rev-parse", "HEAD"]).await
}

/// Default branch of `remote`, from its symbolic HEAD.
pub async fn default_branch(root: &Path, remote: &str) -> String {
    let reference = format!("refs/remotes/{remote}/HEAD");
    match git(root, &["symbolic-ref", "--short", &reference]).await {
        Ok(name) => {
            let prefix = format!("{remote}/");
            name.strip_prefix(&prefix).unwrap_or(&name).to_string()
        }
        Err(err) => {
            debug!(error = %err, "Remote HEAD unknown, assuming {FALLBACK_BASE}");
            FALLBACK_BASE.to_string()
        }
    }
}

/// `git push -u <remote> <branch>`.
pub async fn push(root: &Path, remote: &str, branch: &str) -> Result<()> {
    git(root, &["push", "-u", remote, branch])
        .await
        .with_context(|| format!("Failed to push {branch} to {remote}"))?;
    Ok(())
}

/// Raw log of commits in `base..HEAD` in the format [`crate::commit::parse_log`] reads.
pub async fn commit_log(root: &Path, base: &str) -> Result<String> {
    let range = format!("{base}..HEAD");
    git(root, &["log", crate::commit::LOG_FORMAT, &range]).await
}
