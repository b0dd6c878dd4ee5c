//! shipper CLI library.
//!
//! - `cli/` - argument parsing and dispatch
//! - `ship_cmd` / `watch_cmd` - the two subcommands
//! - `repo`, `git`, `commit`, `config` - what a command needs before it talks to the platform
//! - `display`, `styled_output`, `logging` - terminal output

pub mod cli;
pub mod commit;
pub mod config;
pub mod display;
pub mod git;
pub mod logging;
pub mod repo;
pub mod ship_cmd;
pub mod styled_output;
pub mod watch_cmd;

pub use watch_cmd::RunStatus;
