//! Picking the commit message that titles the review request.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

/// `git log` format: fields split by US (0x1f), records ended by RS (0x1e).
pub const LOG_FORMAT: &str = "--format=%H%x1f%s%x1f%b%x1e";

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// One commit from the branch being shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub subject: String,
    pub body: String,
}

impl CommitInfo {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

/// Title and body for the review request (and the squash commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub title: String,
    pub body: String,
}

impl CommitMessage {
    /// Split free text into a title (first non-blank line) and a body.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (title, body) = text.split_once('\n').unwrap_or((text, ""));
        let title = title.trim();
        if title.is_empty() {
            bail!("Commit message is empty");
        }
        Ok(Self {
            title: title.to_string(),
            body: body.trim().to_string(),
        })
    }

    pub fn from_commit(commit: &CommitInfo) -> Self {
        Self {
            title: commit.subject.trim().to_string(),
            body: commit.body.trim().to_string(),
        }
    }
}

/// Parse `git log` output produced with [`LOG_FORMAT`]. Newest commit first.
pub fn parse_log(raw: &str) -> Vec<CommitInfo> {
    raw.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches(['\n', '\r']);
            let mut fields = record.splitn(3, FIELD_SEP);
            let sha = fields.next()?.trim();
            if sha.is_empty() {
                return None;
            }
            Some(CommitInfo {
                sha: sha.to_string(),
                subject: fields.next().unwrap_or_default().trim().to_string(),
                body: fields.next().unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// Choose the message for the review request.
///
/// An explicit message wins. A single commit is used as is. With several
/// commits the user picks one from a numbered list; the newest is the
/// default and is also taken when `interactive` is false.
pub fn select_message(
    commits: &[CommitInfo],
    explicit: Option<&str>,
    interactive: bool,
    input: &mut dyn BufRead,
    output: &mut dyn Write,
) -> Result<CommitMessage> {
    if let Some(text) = explicit {
        return CommitMessage::parse(text);
    }

    let newest = match commits {
        [] => bail!("Nothing to ship: no commits ahead of the base branch"),
        [only] => return Ok(CommitMessage::from_commit(only)),
        [newest, ..] => newest,
    };
    if !interactive {
        return Ok(CommitMessage::from_commit(newest));
    }

    writeln!(output, "Several commits to ship. Pick the message to use:")?;
    for (index, commit) in commits.iter().enumerate() {
        writeln!(output, "  {}) {} {}", index + 1, commit.short_sha(), commit.subject)?;
    }

    loop {
        write!(output, "Choice [1]: ")?;
        output.flush()?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .context("Failed to read choice")?;
        let choice = line.trim();
        if read == 0 || choice.is_empty() {
            return Ok(CommitMessage::from_commit(newest));
        }

        match choice.parse::<usize>() {
            Ok(n) if (1..=commits.len()).contains(&n) => {
                return Ok(CommitMessage::from_commit(&commits[n - 1]));
            }
            _ => writeln!(output, "Enter a number between 1 and {}.", commits.len())?,
        }
    }
}
