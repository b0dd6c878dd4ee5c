//! CLI argument structures and parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use super::styles::get_styles;
use crate::ship_cmd::ShipCli;
use crate::watch_cmd::WatchCli;

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    Info,
    Debug,
    /// Everything, including HTTP internals
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse a level name, case-insensitively.
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Filter applying this level to shipper's crates and `warn` to dependencies.
    pub fn crate_filter(&self) -> String {
        let level = self.as_filter_str();
        format!("warn,shipper_cli={level},shipper_ci={level},shipper_platform={level}")
    }
}

/// Color output mode for CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if output is a terminal
    #[default]
    Auto,
    /// Always output with colors
    Always,
    /// Never output with colors
    Never,
}

/// Open a pull/merge request for the current branch, wait for CI and merge it.
#[derive(Debug, Parser)]
#[command(name = "shipper", author, version)]
#[command(about = "Ship a branch: open a review request, wait for CI, merge", long_about = None)]
#[command(styles = get_styles())]
pub struct Cli {
    /// Config file (default: .shipper.toml upwards, then the user config dir)
    #[arg(long = "config", short = 'c', global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (debug logging)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    /// Enable trace-level logging
    #[arg(long = "trace", global = true)]
    pub trace: bool,

    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Control color output: auto (default), always, or never
    #[arg(long = "color", global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level forced by `--trace` / `--verbose`, if any.
    pub fn forced_log_level(&self) -> Option<LogLevel> {
        if self.trace {
            Some(LogLevel::Trace)
        } else if self.verbose {
            Some(LogLevel::Debug)
        } else {
            None
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Push the branch, open a review request, wait for CI and merge
    Ship(ShipCli),

    /// Only wait for CI on a commit
    Watch(WatchCli),
}

/// Parse a duration such as `90`, `90s`, `15m` or `1h`. Bare numbers are seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();
    let (num_str, multiplier) = if let Some(num) = s.strip_suffix('h') {
        (num, 60 * 60)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration: {s}"))?;
    if num == 0 {
        return Err("Duration must be greater than 0".to_string());
    }
    let secs = num
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration too large: {s}"))?;
    Ok(Duration::from_secs(secs))
}
