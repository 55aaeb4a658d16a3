use anyhow::{Context, Result};
use chrono::Utc;

use crate::db::Database;
use crate::jira::JiraApi;
use crate::sync::SyncEngine;
use crate::timeparse::{format_duration, to_api_timestamp};

pub fn start(db: &mut Database, issue_key: &str) -> Result<()> {
    let replaced = db.pending_session(issue_key).is_some();
    let session = db.start_session(issue_key, Utc::now())?;

    if replaced {
        println!("Restarted timer for {}", issue_key);
    } else {
        println!("Started timer for {}", issue_key);
    }
    println!("Started at {}", session.started_at.with_timezone(&chrono::Local).format("%H:%M:%S"));
    println!("Run 'jiralog stop' when done.");
    Ok(())
}

/// Stops the timer for `issue_key` and pushes the worklog.
///
/// A session left over from a failed push keeps its original end time and
/// comment, so running `stop` again only retries the push.
pub fn stop<A, F>(
    engine: &mut SyncEngine<A>,
    issue_key: &str,
    comment: Option<&str>,
    ask_comment: F,
) -> Result<()>
where
    A: JiraApi,
    F: FnOnce() -> Result<String>,
{
    let now = Utc::now();
    let db = engine.db_mut();
    db.reload()?;

    let previous = db.pending_session(issue_key).cloned();
    if !previous.as_ref().is_some_and(|s| s.is_stopped()) {
        db.stop_session(issue_key, now)?;
    }

    let comment = match (comment, previous.and_then(|s| s.comment)) {
        (Some(given), _) => given.to_string(),
        (None, Some(saved)) => saved,
        (None, None) => ask_comment()?,
    };
    db.set_session_comment(issue_key, &comment)?;

    let entry = engine
        .sync_at(issue_key, &comment, now)
        .with_context(|| format!("Time for {} is kept; run 'jiralog stop' again to retry", issue_key))?;

    println!("Logged {} on {}", format_duration(entry.time_spent_seconds), issue_key);
    println!("Worklog id: {}", entry.id);
    Ok(())
}

pub fn status(db: &mut Database) -> Result<()> {
    db.reload()?;
    let sessions = db.pending_sessions();
    if sessions.is_empty() {
        println!("No timer running.");
        return Ok(());
    }

    let now = Utc::now();
    for session in sessions {
        let state = if session.is_stopped() {
            "stopped, not logged"
        } else {
            "running"
        };
        println!(
            "{:<12} {:>10}  since {}  ({})",
            session.issue_key,
            format_duration(session.elapsed_seconds(now)),
            to_api_timestamp(&session.started_at),
            state
        );
    }
    Ok(())
}
