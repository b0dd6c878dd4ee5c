//! Status messages on stderr.
//!
//! Colors are used only when stderr is a terminal and `NO_COLOR` is unset.

use std::io::IsTerminal;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Check if colors should be disabled based on NO_COLOR env var.
fn colors_disabled() -> bool {
    std::env::var("NO_COLOR")
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

fn use_colors() -> bool {
    !colors_disabled() && std::io::stderr().is_terminal()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

impl MessageType {
    fn icon(&self) -> &'static str {
        match self {
            MessageType::Success => "✓",
            MessageType::Error => "✗",
            MessageType::Warning => "!",
            MessageType::Info => "→",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            MessageType::Success => GREEN,
            MessageType::Error => RED,
            MessageType::Warning => YELLOW,
            MessageType::Info => CYAN,
        }
    }
}

/// Render a message with its icon, colored when `colored` is set.
pub fn format_message(msg_type: MessageType, message: &str, colored: bool) -> String {
    if colored {
        format!("{}{}{} {}", msg_type.color(), msg_type.icon(), RESET, message)
    } else {
        format!("{} {}", msg_type.icon(), message)
    }
}

pub fn print_styled(msg_type: MessageType, message: &str) {
    eprintln!("{}", format_message(msg_type, message, use_colors()));
}

pub fn print_success(message: &str) {
    print_styled(MessageType::Success, message);
}

pub fn print_error(message: &str) {
    print_styled(MessageType::Error, message);
}

pub fn print_warning(message: &str) {
    print_styled(MessageType::Warning, message);
}

pub fn print_info(message: &str) {
    print_styled(MessageType::Info, message);
}
