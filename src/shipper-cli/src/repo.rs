//! Everything a command needs about the repository it runs in.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use shipper_platform::{Platform, RemoteRepo, parse_remote};
use tracing::info;

use crate::config::Config;
use crate::git;

pub struct RepoContext {
    pub root: PathBuf,
    pub remote_name: String,
    pub remote: RemoteRepo,
    pub config: Config,
    pub platform: Arc<Platform>,
}

impl RepoContext {
    /// Locate the repository, load the config and connect to the platform
    /// hosting the `origin` remote.
    pub async fn open(config_path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = git::repo_root(&cwd).await?;
        let remote_name = git::DEFAULT_REMOTE.to_string();
        let url = git::remote_url(&root, &remote_name).await?;
        let remote = parse_remote(&url)?;

        let (config, source) = Config::load(config_path)?;
        let settings = config.host_settings(&remote.host);
        let platform = Platform::connect(remote.clone(), &settings)
            .with_context(|| format!("Cannot connect to {}", remote.host))?;

        info!(
            repo = %remote,
            platform = %platform.kind(),
            config = ?source,
            "Opened repository"
        );
        Ok(Self {
            root,
            remote_name,
            remote,
            config,
            platform: Arc::new(platform),
        })
    }
}
