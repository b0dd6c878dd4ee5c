//! `shipper ship`: push, open a review request, wait for CI, merge.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use shipper_platform::{MergeMethod, MergeOptions, NewReviewRequest, ReviewHost, ReviewRequest};
use tracing::{info, warn};

use crate::commit::{CommitMessage, parse_log, select_message};
use crate::display::TerminalDisplay;
use crate::git;
use crate::repo::RepoContext;
use crate::styled_output::{print_error, print_info, print_success};
use crate::watch_cmd::{RunStatus, WatchArgs, short, watch_commit};

/// Ship the current branch.
#[derive(Debug, Parser)]
pub struct ShipCli {
    /// Branch to merge into (default: the remote's default branch)
    #[arg(long, short = 'b', value_name = "BRANCH")]
    pub base: Option<String>,

    /// Review request title and body; skips picking a commit message
    #[arg(long, short = 'm', value_name = "MESSAGE")]
    pub message: Option<String>,

    /// How to merge: merge, squash or rebase (default from config: squash)
    #[arg(long = "merge-method", value_name = "METHOD")]
    pub merge_method: Option<MergeMethod>,

    /// Open the review request as a draft; drafts are never merged
    #[arg(long)]
    pub draft: bool,

    /// Do not push; the branch must already be on the remote
    #[arg(long = "no-push")]
    pub no_push: bool,

    /// Stop after CI passes instead of merging
    #[arg(long = "no-merge")]
    pub no_merge: bool,

    /// Keep the source branch after merging
    #[arg(long = "keep-branch")]
    pub keep_branch: bool,

    #[command(flatten)]
    pub watch: WatchArgs,
}

impl ShipCli {
    pub async fn run(self, config_path: Option<&Path>) -> Result<RunStatus> {
        let ctx = RepoContext::open(config_path).await?;
        let noun = ctx.platform.kind().request_noun();

        let branch = git::current_branch(&ctx.root).await?;
        let base = match &self.base {
            Some(base) => base.clone(),
            None => git::default_branch(&ctx.root, &ctx.remote_name).await,
        };
        if branch == base {
            bail!("Already on {base}; check out the branch to ship first");
        }

        let message = self.pick_message(&ctx, &base).await?;
        let local_sha = git::head_sha(&ctx.root).await?;

        if self.no_push {
            info!(%branch, "Skipping push");
        } else {
            print_info(&format!("Pushing {branch} to {}", ctx.remote_name));
            git::push(&ctx.root, &ctx.remote_name, &branch).await?;
        }

        let request = ctx
            .platform
            .create_request(&NewReviewRequest {
                title: message.title.clone(),
                body: message.body.clone(),
                source_branch: branch.clone(),
                target_branch: base.clone(),
                draft: self.draft,
            })
            .await
            .with_context(|| format!("Failed to open {noun} for {branch}"))?;
        print_success(&format!("Opened {noun} #{}: {}", request.number, request.url));

        let sha = watched_sha(&request, &local_sha);
        let (timeout, options) = self.watch.resolve(&ctx.config.watch);
        let display = TerminalDisplay::new()?;
        display.println(&format!("Waiting for CI on {}", short(&sha)));
        let status =
            watch_commit(ctx.platform.clone(), &sha, timeout, options, display).await?;

        match &status {
            RunStatus::Success if self.draft => {
                print_info(&format!(
                    "CI passed; {noun} #{} is a draft, not merging",
                    request.number
                ));
            }
            RunStatus::Success if self.no_merge => {
                print_info(&format!("CI passed; leaving {noun} #{} open", request.number));
            }
            RunStatus::Success => {
                let options = self.merge_options(&ctx, &message);
                ctx.platform
                    .merge_request(&request, &options)
                    .await
                    .with_context(|| format!("Failed to merge {noun} #{}", request.number))?;
                print_success(&format!(
                    "Merged {noun} #{} into {base} ({})",
                    request.number, options.method
                ));
            }
            RunStatus::CiFailed(conclusion) => {
                print_error(&format!(
                    "Not merging {noun} #{}: CI concluded {conclusion}",
                    request.number
                ));
            }
            RunStatus::TimedOut => {
                print_error(&format!(
                    "Not merging {noun} #{}: CI did not finish in time",
                    request.number
                ));
            }
        }
        Ok(status)
    }

    async fn pick_message(&self, ctx: &RepoContext, base: &str) -> Result<CommitMessage> {
        if let Some(text) = &self.message {
            return CommitMessage::parse(text);
        }

        let upstream = format!("{}/{}", ctx.remote_name, base);
        let log = git::commit_log(&ctx.root, &upstream)
            .await
            .with_context(|| format!("Failed to list commits ahead of {upstream}"))?;
        let commits = parse_log(&log);

        let stdin = std::io::stdin();
        let interactive = stdin.is_terminal();
        let mut input = stdin.lock();
        let mut output = std::io::stderr();
        select_message(&commits, None, interactive, &mut input, &mut output)
    }

    fn merge_options(&self, ctx: &RepoContext, message: &CommitMessage) -> MergeOptions {
        MergeOptions {
            method: self.merge_method.unwrap_or(ctx.config.merge.method),
            delete_branch: ctx.config.merge.delete_branch && !self.keep_branch,
            commit_title: Some(message.title.clone()),
            commit_message: (!message.body.is_empty()).then(|| message.body.clone()),
        }
    }
}

/// The commit whose CI gates the merge.
///
/// The platform's view of the head wins; the local HEAD is only used when
/// the platform did not report one.
fn watched_sha(request: &ReviewRequest, local_sha: &str) -> String {
    if request.head_sha.is_empty() {
        return local_sha.to_string();
    }
    if request.head_sha != local_sha {
        warn!(
            remote = %request.head_sha,
            local = local_sha,
            "Review request head differs from local HEAD"
        );
    }
    request.head_sha.clone()
}
