pub mod comment;
pub mod info;
pub mod issue;
pub mod log;
pub mod setup;
pub mod timer;
pub mod worklog;

use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Asks for one line on stdin.
pub fn prompt(label: &str) -> Result<String> {
    let stdin = io::stdin();
    prompt_from(&mut stdin.lock(), label)
}

pub(crate) fn prompt_from(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

/// Prints every message carried by a failed operation, one per line.
pub fn report(err: &anyhow::Error) {
    for line in report_lines(err) {
        eprintln!("Error: {}", line);
    }
}

/// Jira failures list each message Jira sent, after any context the
/// command added around them.
pub(crate) fn report_lines(err: &anyhow::Error) -> Vec<String> {
    use crate::error::TimelogError;
    use crate::jira::RemoteError;

    let remote = match err.downcast_ref::<TimelogError>() {
        Some(TimelogError::Remote(remote)) => Some(remote),
        _ => err.downcast_ref::<RemoteError>(),
    };
    let Some(remote) = remote else {
        return vec![format!("{:#}", err)];
    };

    let mut lines = Vec::new();
    let outer = err.to_string();
    if outer != remote.to_string() {
        lines.push(outer);
    }
    lines.extend(remote.messages());
    lines
}
