//! Jira REST collaborator.
//!
//! [`JiraApi`] is the seam the sync engine and commands talk to.
//! [`JiraClient`] implements it over HTTP; tests use an in-memory fake.
//! Every response passes through [`check_response`], which is the only
//! place that knows about Jira's `errorMessages` / `errors` body shape.

pub mod adf;
mod client;
pub mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

pub use adf::Document;
pub use client::JiraClient;
pub use types::{
    CommentPage, CommentResponse, IssueSearch, SprintPage, TransitionList, User, WorklogResponse,
};

#[derive(Error, Debug)]
pub enum RemoteError {
    /// Jira answered with an error body.
    #[error("Jira rejected the request: {}", .0.join("; "))]
    Rejected(Vec<String>),

    /// The request never produced a response.
    #[error("Could not reach Jira: {0}")]
    Transport(String),

    /// Jira answered, but not with what we expected.
    #[error("Unexpected response from Jira: {0}")]
    Decode(String),
}

impl RemoteError {
    /// One line per underlying problem, for console output.
    pub fn messages(&self) -> Vec<String> {
        match self {
            RemoteError::Rejected(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Operations the tracker needs from Jira.
pub trait JiraApi {
    fn add_worklog(
        &self,
        issue_key: &str,
        comment: &str,
        started: &str,
        time_spent_seconds: i64,
    ) -> Result<WorklogResponse, RemoteError>;

    fn delete_worklog(&self, issue_key: &str, worklog_id: &str) -> Result<(), RemoteError>;

    fn add_comment(&self, issue_key: &str, body: &Document) -> Result<CommentResponse, RemoteError>;

    fn delete_comment(&self, issue_key: &str, comment_id: &str) -> Result<(), RemoteError>;

    fn find_issue(&self, issue_key: &str, fields: &[String]) -> Result<IssueSearch, RemoteError>;

    fn get_comments(&self, issue_key: &str) -> Result<CommentPage, RemoteError>;

    fn find_user(&self, query: &str) -> Result<Vec<User>, RemoteError>;

    fn current_user(&self) -> Result<User, RemoteError>;

    fn active_sprint(&self, board_id: u64) -> Result<SprintPage, RemoteError>;

    fn sprint_issues(&self, sprint_id: u64, jql: &str) -> Result<IssueSearch, RemoteError>;

    fn transitions(&self, issue_key: &str) -> Result<TransitionList, RemoteError>;

    fn set_transition(&self, issue_key: &str, transition_id: &str) -> Result<(), RemoteError>;

    fn assign_issue(&self, issue_key: &str, account_id: &str) -> Result<(), RemoteError>;
}

/// Collects the messages of a Jira error body, or `None` for a success body.
pub fn error_messages(body: &Value) -> Option<Vec<String>> {
    let mut messages = Vec::new();

    if let Some(list) = body.get("errorMessages").and_then(Value::as_array) {
        messages.extend(list.iter().map(value_text));
    }
    if let Some(map) = body.get("errors").and_then(Value::as_object) {
        messages.extend(map.iter().map(|(field, msg)| format!("{}: {}", field, value_text(msg))));
    }

    if messages.is_empty() {
        None
    } else {
        Some(messages)
    }
}

/// Turns a decoded response body into the expected payload or a
/// [`RemoteError::Rejected`], logging each error item.
pub fn check_response<T: DeserializeOwned>(body: Value) -> Result<T, RemoteError> {
    if let Some(messages) = error_messages(&body) {
        for message in &messages {
            error!(%message, "jira error");
        }
        return Err(RemoteError::Rejected(messages));
    }
    serde_json::from_value(body).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
