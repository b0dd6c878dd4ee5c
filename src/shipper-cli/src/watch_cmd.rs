//! `shipper watch` and the CI wait shared with `shipper ship`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use shipper_ci::{CiProvider, CompletionPoller, Conclusion, WatchOptions};
use tracing::info;

use crate::cli::args::parse_duration;
use crate::config::WatchConfig;
use crate::display::TerminalDisplay;
use crate::git;
use crate::repo::RepoContext;

/// How a command ended, mapped onto the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// CI finished with a non-success conclusion.
    CiFailed(Conclusion),
    TimedOut,
}

impl RunStatus {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::CiFailed(_) => 1,
            RunStatus::TimedOut => 2,
        }
    }
}

/// CI wait flags shared by `ship` and `watch`.
#[derive(Debug, Clone, Default, Args)]
pub struct WatchArgs {
    /// Give up waiting for CI after this long (e.g. 90s, 30m, 2h)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Time between CI polls
    #[arg(long = "poll-interval", value_name = "DURATION", value_parser = parse_duration)]
    pub poll_interval: Option<Duration>,
}

impl WatchArgs {
    /// Timeout and watch options with flags applied over the config.
    pub fn resolve(&self, config: &WatchConfig) -> (Duration, WatchOptions) {
        let mut options = config.watch_options();
        if let Some(interval) = self.poll_interval {
            options.poll_interval = interval;
        }
        (self.timeout.unwrap_or_else(|| config.timeout()), options)
    }
}

/// Wait for CI on a commit without opening or merging anything.
#[derive(Debug, Parser)]
pub struct WatchCli {
    /// Commit to watch (sha or any revision git understands)
    #[arg(default_value = "HEAD")]
    pub commit: String,

    #[command(flatten)]
    pub watch: WatchArgs,
}

impl WatchCli {
    pub async fn run(self, config_path: Option<&Path>) -> Result<RunStatus> {
        let ctx = RepoContext::open(config_path).await?;
        let revision = format!("{}^{{commit}}", self.commit);
        let sha = git::git(&ctx.root, &["rev-parse", "--verify", &revision])
            .await
            .with_context(|| format!("Unknown commit '{}'", self.commit))?;

        let (timeout, options) = self.watch.resolve(&ctx.config.watch);
        let display = TerminalDisplay::new()?;
        display.println(&format!("Watching CI for {}", short(&sha)));
        watch_commit(ctx.platform, &sha, timeout, options, display).await
    }
}

/// Run the completion poller for `sha` and map its result to a [`RunStatus`].
pub async fn watch_commit<P: CiProvider + ?Sized>(
    provider: Arc<P>,
    sha: &str,
    timeout: Duration,
    options: WatchOptions,
    display: TerminalDisplay,
) -> Result<RunStatus> {
    let poller = CompletionPoller::with_options(provider, Arc::new(display), options);
    match poller.wait(sha, timeout).await {
        Ok(Conclusion::Success) => Ok(RunStatus::Success),
        Ok(conclusion) => {
            info!(commit = sha, %conclusion, "CI did not pass");
            Ok(RunStatus::CiFailed(conclusion))
        }
        Err(err) if err.is_timeout() => Ok(RunStatus::TimedOut),
        Err(err) => Err(err).context("Failed to watch CI"),
    }
}

pub(crate) fn short(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
