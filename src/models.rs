use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time being tracked against an issue that has not been sent to Jira yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSession {
    pub issue_key: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl PendingSession {
    pub fn new(issue_key: &str, started_at: DateTime<Utc>) -> Self {
        PendingSession {
            issue_key: issue_key.to_string(),
            started_at,
            ended_at: None,
            comment: None,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Whole seconds between start and `ended_at`, or `now` while running.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        end.signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }
}

/// A worklog that Jira accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogEntry {
    pub id: String,
    pub issue_key: String,
    pub comment: String,
    pub time_spent_seconds: i64,
    pub started: String,
}

/// A comment that Jira accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEntry {
    pub id: String,
    pub issue_key: String,
    pub comment: String,
    pub created: String,
}

/// Everything the store file holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub issues: BTreeMap<String, PendingSession>,
    #[serde(default)]
    pub worklogs: Vec<WorklogEntry>,
    #[serde(default)]
    pub comments: Vec<CommentEntry>,
}
