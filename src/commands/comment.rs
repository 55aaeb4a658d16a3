use anyhow::Result;

use super::truncate;
use crate::db::Database;
use crate::jira::JiraApi;
use crate::sync::SyncEngine;

pub fn add<A: JiraApi>(
    engine: &mut SyncEngine<A>,
    issue_key: &str,
    text: &str,
    mention: Option<&str>,
) -> Result<()> {
    let entry = engine.add_comment(issue_key, text, mention)?;
    println!("Added comment {} to {}", entry.id, issue_key);
    Ok(())
}

pub fn list(db: &mut Database, max: usize) -> Result<()> {
    db.reload()?;
    let comments = db.list_comments(max);
    if comments.is_empty() {
        println!("No comments added yet.");
        return Ok(());
    }

    println!("{:<10} {:<12} {:<29} Comment", "Id", "Issue", "Created");
    for c in comments {
        println!(
            "{:<10} {:<12} {:<29} {}",
            c.id,
            c.issue_key,
            c.created,
            truncate(&c.comment, 50)
        );
    }
    Ok(())
}

/// Deletes comment `id`, or the latest one, in Jira and locally.
pub fn delete<A: JiraApi>(engine: &mut SyncEngine<A>, id: Option<&str>) -> Result<()> {
    let deleted = engine.delete_comment(id)?;
    println!("Deleted comment {} from {}", deleted.id, deleted.issue_key);
    Ok(())
}
