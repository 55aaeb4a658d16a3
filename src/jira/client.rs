use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use super::types::{
    CommentPage, CommentResponse, IssueSearch, SprintPage, TransitionList, User, WorklogResponse,
};
use super::{check_response, error_messages, Document, JiraApi, RemoteError};

const DEFAULT_ISSUE_FIELDS: [&str; 6] = [
    "summary",
    "issuetype",
    "reporter",
    "assignee",
    "status",
    "description",
];

/// Blocking HTTP client for Jira Cloud, authenticated with an API token.
pub struct JiraClient {
    http: Client,
    base: String,
    username: String,
    api_token: String,
}

impl JiraClient {
    pub fn new(
        endpoint: &str,
        username: &str,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jiralog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(JiraClient {
            http,
            base: endpoint.trim_end_matches('/').to_string(),
            username: username.to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/rest/api/3{}", self.base, path)
    }

    fn agile(&self, path: &str) -> String {
        format!("{}/rest/agile/1.0{}", self.base, path)
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        debug!(%method, url, "jira request");

        let mut request = self
            .http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status();
        debug!(%status, url, "jira response");

        if status == StatusCode::NO_CONTENT {
            return Ok(json!({}));
        }
        let text = response
            .text()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        decode_body(status, &text)
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T, RemoteError> {
        check_response(self.send(method, url, query, body)?)
    }

    fn call_unit(&self, method: Method, url: &str, body: Option<&Value>) -> Result<(), RemoteError> {
        self.call::<Value>(method, url, &[], body).map(|_| ())
    }
}

/// Error bodies pass through untouched so [`check_response`] reports their
/// messages. Other failures are turned into a one-line rejection.
fn decode_body(status: StatusCode, text: &str) -> Result<Value, RemoteError> {
    if text.trim().is_empty() {
        return if status.is_success() {
            Ok(json!({}))
        } else {
            Err(RemoteError::Rejected(vec![format!("HTTP {}", status)]))
        };
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) if status.is_success() || error_messages(&value).is_some() => Ok(value),
        Ok(_) => Err(RemoteError::Rejected(vec![format!("HTTP {}", status)])),
        Err(e) if status.is_success() => Err(RemoteError::Decode(e.to_string())),
        Err(_) => Err(RemoteError::Rejected(vec![format!(
            "HTTP {}: {}",
            status,
            snippet(text)
        )])),
    }
}

fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 120 {
        let cut: String = line.chars().take(117).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

impl JiraApi for JiraClient {
    fn add_worklog(
        &self,
        issue_key: &str,
        comment: &str,
        started: &str,
        time_spent_seconds: i64,
    ) -> Result<WorklogResponse, RemoteError> {
        let mut body = Map::new();
        if let Some(doc) = Document::from_text(comment) {
            body.insert("comment".into(), doc.to_value());
        }
        body.insert("started".into(), json!(started));
        body.insert("timeSpentSeconds".into(), json!(time_spent_seconds));

        let url = self.api(&format!("/issue/{}/worklog", issue_key));
        self.call(Method::POST, &url, &[], Some(&Value::Object(body)))
    }

    fn delete_worklog(&self, issue_key: &str, worklog_id: &str) -> Result<(), RemoteError> {
        let url = self.api(&format!("/issue/{}/worklog/{}", issue_key, worklog_id));
        self.call_unit(Method::DELETE, &url, None)
    }

    fn add_comment(&self, issue_key: &str, body: &Document) -> Result<CommentResponse, RemoteError> {
        let url = self.api(&format!("/issue/{}/comment", issue_key));
        let payload = json!({ "body": body.to_value() });
        self.call(Method::POST, &url, &[], Some(&payload))
    }

    fn delete_comment(&self, issue_key: &str, comment_id: &str) -> Result<(), RemoteError> {
        let url = self.api(&format!("/issue/{}/comment/{}", issue_key, comment_id));
        self.call_unit(Method::DELETE, &url, None)
    }

    fn find_issue(&self, issue_key: &str, fields: &[String]) -> Result<IssueSearch, RemoteError> {
        let fields: Vec<&str> = if fields.is_empty() {
            DEFAULT_ISSUE_FIELDS.to_vec()
        } else {
            fields.iter().map(String::as_str).collect()
        };
        let payload = json!({
            "jql": format!("key = {}", issue_key),
            "fields": fields,
        });
        self.call(Method::POST, &self.api("/search"), &[], Some(&payload))
    }

    fn get_comments(&self, issue_key: &str) -> Result<CommentPage, RemoteError> {
        let url = self.api(&format!("/issue/{}/comment", issue_key));
        self.call(Method::GET, &url, &[], None)
    }

    fn find_user(&self, query: &str) -> Result<Vec<User>, RemoteError> {
        self.call(Method::GET, &self.api("/user/search"), &[("query", query)], None)
    }

    fn current_user(&self) -> Result<User, RemoteError> {
        self.call(Method::GET, &self.api("/myself"), &[], None)
    }

    fn active_sprint(&self, board_id: u64) -> Result<SprintPage, RemoteError> {
        let url = self.agile(&format!("/board/{}/sprint", board_id));
        self.call(Method::GET, &url, &[("state", "active")], None)
    }

    fn sprint_issues(&self, sprint_id: u64, jql: &str) -> Result<IssueSearch, RemoteError> {
        let url = self.agile(&format!("/sprint/{}/issue", sprint_id));
        let fields = DEFAULT_ISSUE_FIELDS.join(",");
        self.call(Method::GET, &url, &[("jql", jql), ("fields", fields.as_str())], None)
    }

    fn transitions(&self, issue_key: &str) -> Result<TransitionList, RemoteError> {
        let url = self.api(&format!("/issue/{}/transitions", issue_key));
        self.call(Method::GET, &url, &[], None)
    }

    fn set_transition(&self, issue_key: &str, transition_id: &str) -> Result<(), RemoteError> {
        let url = self.api(&format!("/issue/{}/transitions", issue_key));
        let payload = json!({ "transition": { "id": transition_id } });
        self.call_unit(Method::POST, &url, Some(&payload))
    }

    fn assign_issue(&self, issue_key: &str, account_id: &str) -> Result<(), RemoteError> {
        let url = self.api(&format!("/issue/{}/assignee", issue_key));
        let payload = json!({ "accountId": account_id });
        self.call_unit(Method::PUT, &url, Some(&payload))
    }
}
