use anyhow::Result;

use super::truncate;
use crate::db::Database;
use crate::jira::JiraApi;
use crate::sync::SyncEngine;
use crate::timeparse::format_duration;

pub const DEFAULT_LIST_LEN: usize = 10;

pub fn list(db: &mut Database, max: usize) -> Result<()> {
    db.reload()?;
    let worklogs = db.list_worklogs(max);
    if worklogs.is_empty() {
        println!("No worklogs added yet.");
        return Ok(());
    }

    println!("{:<10} {:<12} {:>9}  {:<29} Comment", "Id", "Issue", "Spent", "Started");
    for w in worklogs {
        println!(
            "{:<10} {:<12} {:>9}  {:<29} {}",
            w.id,
            w.issue_key,
            format_duration(w.time_spent_seconds),
            w.started,
            truncate(&w.comment, 40)
        );
    }
    Ok(())
}

/// Deletes worklog `id`, or the latest one, in Jira and locally.
pub fn delete<A: JiraApi>(engine: &mut SyncEngine<A>, id: Option<&str>) -> Result<()> {
    let deleted = engine.delete_worklog(id)?;
    println!(
        "Deleted worklog {} ({} on {})",
        deleted.id,
        format_duration(deleted.time_spent_seconds),
        deleted.issue_key
    );
    Ok(())
}
