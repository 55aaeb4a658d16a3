//! Moves tracked time and comments from the local store into Jira.
//!
//! Per issue key a session goes `start` → `stop` → `sync`. A successful
//! sync drops the pending session and records the worklog. A failed one
//! leaves the session where it was so the same `stop` can be retried.
//! Deletions ask Jira first and only touch the store once Jira agreed.

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Result, TimelogError};
use crate::jira::{Document, JiraApi, RemoteError, WorklogResponse};
use crate::models::{CommentEntry, WorklogEntry};
use crate::timeparse::to_api_timestamp;

pub struct SyncEngine<A: JiraApi> {
    db: Database,
    api: A,
}

impl<A: JiraApi> SyncEngine<A> {
    pub fn new(db: Database, api: A) -> Self {
        SyncEngine { db, api }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Sends one worklog to Jira.
    pub fn push_worklog(
        &self,
        issue_key: &str,
        comment: &str,
        started: &str,
        duration_seconds: i64,
    ) -> std::result::Result<WorklogResponse, RemoteError> {
        let result = self
            .api
            .add_worklog(issue_key, comment, started, duration_seconds);
        match &result {
            Ok(worklog) => info!(issue = issue_key, id = %worklog.id, seconds = duration_seconds, "worklog pushed"),
            Err(e) => warn!(issue = issue_key, error = %e, "worklog push failed"),
        }
        result
    }

    pub fn sync(&mut self, issue_key: &str, comment: &str) -> Result<WorklogEntry> {
        self.sync_at(issue_key, comment, Utc::now())
    }

    /// Syncs the pending session for `issue_key`. A running session is
    /// measured up to `now`, a stopped one up to its end time.
    pub fn sync_at(&mut self, issue_key: &str, comment: &str, now: DateTime<Utc>) -> Result<WorklogEntry> {
        self.db.reload()?;
        let session = self
            .db
            .pending_session(issue_key)
            .cloned()
            .ok_or_else(|| TimelogError::not_found(format!("No timer running for {}", issue_key)))?;

        let started = to_api_timestamp(&session.started_at);
        let seconds = session.elapsed_seconds(now);
        let response = self.push_worklog(issue_key, comment, &started, seconds)?;

        let entry = worklog_entry(issue_key, comment, response);
        self.db.complete_session(issue_key, entry.clone())?;
        Ok(entry)
    }

    /// Logs an explicit interval that was never tracked with start/stop.
    pub fn log_work<Tz: TimeZone>(
        &mut self,
        issue_key: &str,
        comment: &str,
        started: &DateTime<Tz>,
        seconds: i64,
    ) -> Result<WorklogEntry> {
        let response = self.push_worklog(issue_key, comment, &to_api_timestamp(started), seconds)?;
        let entry = worklog_entry(issue_key, comment, response);
        self.db.add_worklog(entry.clone())?;
        Ok(entry)
    }

    /// Deletes worklog `id`, or the most recently added one.
    pub fn delete_worklog(&mut self, id: Option<&str>) -> Result<WorklogEntry> {
        self.db.reload()?;
        let target = match id {
            Some(id) => self
                .db
                .worklog_by_id(id)
                .cloned()
                .ok_or_else(|| TimelogError::not_found(format!("No worklog found with id {}", id)))?,
            None => self
                .db
                .latest_worklog()
                .cloned()
                .ok_or_else(|| TimelogError::not_found("No worklogs added yet"))?,
        };

        self.api.delete_worklog(&target.issue_key, &target.id)?;
        self.db.remove_worklog(&target.id)?;
        info!(issue = %target.issue_key, id = %target.id, "worklog deleted");
        Ok(target)
    }

    /// Posts a comment, optionally mentioning the first user matching `mention`.
    pub fn add_comment(&mut self, issue_key: &str, text: &str, mention: Option<&str>) -> Result<CommentEntry> {
        let mut doc = Document::new();
        let paragraph = doc.paragraph(text);
        if let Some(query) = mention {
            match self.api.find_user(query)?.first() {
                Some(user) => doc.mention(paragraph, &user.account_id),
                None => return Err(TimelogError::not_found(format!("No Jira user matches '{}'", query))),
            }
        }

        let response = self.api.add_comment(issue_key, &doc)?;
        let entry = CommentEntry {
            id: response.id,
            issue_key: issue_key.to_string(),
            comment: text.to_string(),
            created: if response.created.is_empty() {
                to_api_timestamp(&Local::now())
            } else {
                response.created
            },
        };
        self.db.add_comment(entry.clone())?;
        info!(issue = issue_key, id = %entry.id, "comment added");
        Ok(entry)
    }

    /// Deletes comment `id`, or the most recently added one.
    pub fn delete_comment(&mut self, id: Option<&str>) -> Result<CommentEntry> {
        self.db.reload()?;
        let target = match id {
            Some(id) => self
                .db
                .comment_by_id(id)
                .cloned()
                .ok_or_else(|| TimelogError::not_found(format!("Comment with id {} not found", id)))?,
            None => self
                .db
                .latest_comment()
                .cloned()
                .ok_or_else(|| TimelogError::not_found("No comments added yet"))?,
        };

        self.api.delete_comment(&target.issue_key, &target.id)?;
        self.db.remove_comment(&target.id)?;
        info!(issue = %target.issue_key, id = %target.id, "comment deleted");
        Ok(target)
    }
}

fn worklog_entry(issue_key: &str, comment: &str, response: WorklogResponse) -> WorklogEntry {
    WorklogEntry {
        id: response.id,
        issue_key: issue_key.to_string(),
        comment: comment.to_string(),
        time_spent_seconds: response.time_spent_seconds,
        started: response.started,
    }
}
