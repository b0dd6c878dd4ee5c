//! Configuration file loading.
//!
//! Lookup order:
//! 1. `--config <path>`
//! 2. `SHIPPER_CONFIG`
//! 3. `.shipper.toml` in the current directory or any parent
//! 4. `<config_dir>/shipper/config.toml`
//!
//! A missing file means defaults. An explicitly named file must exist.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use shipper_ci::{TrackerOptions, WatchOptions};
use shipper_platform::{HostSettings, MergeMethod, PlatformKind};
use tracing::debug;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "SHIPPER_CONFIG";

/// Per-project config file name, searched upwards from the working directory.
pub const PROJECT_CONFIG_FILE: &str = ".shipper.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub watch: WatchConfig,
    pub merge: MergeConfig,
    pub hosts: BTreeMap<String, HostConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub refresh_interval_ms: u64,
    /// `0` keeps indicators of vanished jobs untouched.
    pub lost_after_cycles: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3600,
            poll_interval_secs: 5,
            refresh_interval_ms: 1000,
            lost_after_cycles: 0,
        }
    }
}

impl WatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            tracker: TrackerOptions {
                refresh_interval: Duration::from_millis(self.refresh_interval_ms.max(1)),
                lost_after: (self.lost_after_cycles > 0).then_some(self.lost_after_cycles),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    pub method: MergeMethod,
    pub delete_branch: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            method: MergeMethod::Squash,
            delete_branch: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub kind: Option<PlatformKind>,
    /// Name of the environment variable holding the token.
    pub token_env: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
}

impl Config {
    /// Load the config, following the lookup order.
    ///
    /// Returns the config and the file it came from, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let from_env = std::env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let path = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path)
            }
            None => discover(&cwd),
        };

        let Some(path) = path else {
            debug!("No config file found, using defaults");
            return Ok((Self::default(), None));
        };

        let config = Self::from_file(&path)?;
        debug!(path = %path.display(), "Loaded config");
        Ok((config, Some(path)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.timeout_secs == 0 {
            bail!("watch.timeout_secs must be greater than 0");
        }
        if self.watch.poll_interval_secs == 0 {
            bail!("watch.poll_interval_secs must be greater than 0");
        }
        Ok(())
    }

    /// Connection settings for `host`, with the token resolved.
    ///
    /// Without a `[hosts]` entry the token comes from the platform's usual
    /// environment variables.
    pub fn host_settings(&self, host: &str) -> HostSettings {
        let entry = self.hosts.get(host).cloned().unwrap_or_default();
        let kind = entry.kind.or_else(|| PlatformKind::infer(host));

        let token = entry
            .token_env
            .as_deref()
            .and_then(read_env)
            .or(entry.token)
            .or_else(|| default_token_vars(kind).iter().find_map(|var| read_env(var)));

        HostSettings {
            kind,
            api_url: entry.api_url,
            token,
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn default_token_vars(kind: Option<PlatformKind>) -> &'static [&'static str] {
    match kind {
        Some(PlatformKind::GitHub) => &["GITHUB_TOKEN", "GH_TOKEN"],
        Some(PlatformKind::GitLab) => &["GITLAB_TOKEN", "GL_TOKEN"],
        None => &[],
    }
}

/// Find the config file for `start_dir` without an explicit path.
pub fn discover(start_dir: &Path) -> Option<PathBuf> {
    find_up(start_dir, PROJECT_CONFIG_FILE).or_else(|| {
        let global = dirs::config_dir()?.join("shipper").join("config.toml");
        global.is_file().then_some(global)
    })
}

/// Walk up from `start_dir` looking for `filename`.
pub fn find_up(start_dir: &Path, filename: &str) -> Option<PathBuf> {
    start_dir.ancestors().find_map(|dir| {
        let candidate = dir.join(filename);
        candidate.is_file().then_some(candidate)
    })
}
