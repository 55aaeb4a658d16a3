use anyhow::{anyhow, Result};
use std::fmt::Write;

use crate::jira::adf::to_plain_text;
use crate::jira::types::{Issue, RemoteComment};
use crate::jira::JiraApi;
use crate::timeparse::parse_api_timestamp;

const DIVIDER: &str = "=====================================================";

pub fn run<A: JiraApi>(api: &A, issue_key: &str, fields: &[String]) -> Result<()> {
    let search = api.find_issue(issue_key, fields)?;
    let issue = search
        .issues
        .first()
        .ok_or_else(|| anyhow!("Issue {} not found", issue_key))?;
    let comments = api.get_comments(issue_key)?;

    print!("{}", render(issue, &comments.comments));
    Ok(())
}

pub fn render(issue: &Issue, comments: &[RemoteComment]) -> String {
    let fields = &issue.fields;
    let name = |u: &Option<crate::jira::User>| {
        u.as_ref().map(|u| u.name().to_string()).unwrap_or_else(|| "-".to_string())
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", DIVIDER);
    let _ = writeln!(
        out,
        "[{}] {} {}",
        fields
            .issuetype
            .as_ref()
            .map(|t| t.name.to_uppercase())
            .unwrap_or_else(|| "ISSUE".to_string()),
        issue.key,
        fields.summary.as_deref().unwrap_or_default()
    );
    let _ = writeln!(out, "{}", DIVIDER);
    let _ = writeln!(out, "Reporter: {}", name(&fields.reporter));
    let _ = writeln!(out, "Assignee: {}", name(&fields.assignee));
    if let Some(status) = &fields.status {
        let _ = writeln!(out, "Status:   {}", status.name.to_uppercase());
    }

    if let Some(description) = fields.description.as_ref().map(to_plain_text) {
        if !description.is_empty() {
            let _ = writeln!(out, "\nDescription:");
            for line in description.lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
    }

    if !comments.is_empty() {
        let _ = writeln!(out, "\nComments:");
        for comment in comments {
            let created = parse_api_timestamp(&comment.created)
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| comment.created.clone());
            let _ = writeln!(out, "  [{}] {}", name(&comment.author), created);
            let text = comment.body.as_ref().map(to_plain_text).unwrap_or_default();
            for line in text.lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::types::{IssueFields, Named};
    use crate::jira::{Document, User};
    use crate::sync::fake::FakeJira;

    fn sample_issue() -> Issue {
        Issue {
            id: "100".to_string(),
            key: "PROJ-7".to_string(),
            fields: IssueFields {
                summary: Some("Login form".to_string()),
                issuetype: Some(Named { name: "Bug".to_string() }),
                reporter: Some(User {
                    account_id: "r".to_string(),
                    display_name: Some("Rita Reporter".to_string()),
                    email_address: None,
                }),
                assignee: None,
                status: Some(Named { name: "In Progress".to_string() }),
                description: Document::from_text("Button does nothing").map(|d| d.to_value()),
            },
        }
    }

    #[test]
    fn test_render_issue() {
        let comment = RemoteComment {
            id: "1".to_string(),
            author: None,
            body: Document::from_text("On it").map(|d| d.to_value()),
            created: "garbage".to_string(),
        };
        let text = render(&sample_issue(), &[comment]);

        assert!(text.contains("[BUG] PROJ-7 Login form"));
        assert!(text.contains("Reporter: Rita Reporter"));
        assert!(text.contains("Assignee: -"));
        assert!(text.contains("Status:   IN PROGRESS"));
        assert!(text.contains("  Button does nothing"));
        assert!(text.contains("[-] garbage"));
        assert!(text.contains("    On it"));
    }

    #[test]
    fn test_render_without_comments() {
        let text = render(&sample_issue(), &[]);
        assert!(!text.contains("Comments:"));
    }

    #[test]
    fn test_run_missing_issue() {
        let api = FakeJira::default();
        let err = run(&api, "PROJ-404", &[]).unwrap_err();
        assert!(err.to_string().contains("PROJ-404 not found"));
    }
}
