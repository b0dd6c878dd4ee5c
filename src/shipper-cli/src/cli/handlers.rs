//! Command dispatch.

use anyhow::Result;

use super::args::{Cli, Commands};
use crate::watch_cmd::RunStatus;

/// Route a parsed command line to its handler.
pub async fn dispatch_command(cli: Cli) -> Result<RunStatus> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Ship(ship_cli) => ship_cli.run(config).await,
        Commands::Watch(watch_cli) => watch_cli.run(config).await,
    }
}
