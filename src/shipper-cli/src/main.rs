//! shipper - open a review request for the current branch, wait for its CI
//! and merge it.
//!
//! Exit codes: `0` shipped (or CI passed), `1` CI failed or an error
//! occurred, `2` CI timed out.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use shipper_cli::cli::{Cli, ColorMode, dispatch_command};
use shipper_cli::logging;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // SAFETY: Environment variable mutations happen early before threads spawn
    match cli.color {
        ColorMode::Never => unsafe { std::env::set_var("NO_COLOR", "1") },
        ColorMode::Always => unsafe { std::env::remove_var("NO_COLOR") },
        ColorMode::Auto => {}
    }

    let _log_guard = logging::init(cli.forced_log_level(), cli.log_file.as_deref())?;

    let status = dispatch_command(cli).await?;
    Ok(ExitCode::from(status.exit_code()))
}
