use anyhow::{bail, Result};
use clap::ValueEnum;

use super::truncate;
use crate::jira::types::Issue;
use crate::jira::JiraApi;

/// Workflow statuses the board uses, by their Jira names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Status {
    DevReady,
    Todo,
    Progress,
    Review,
    Done,
    Closed,
    Wait,
}

impl Status {
    pub fn jira_name(self) -> &'static str {
        match self {
            Status::DevReady => "Ready for development",
            Status::Todo => "To Do",
            Status::Progress => "In Progress",
            Status::Review => "Review",
            Status::Done => "Done",
            Status::Closed => "Closed",
            Status::Wait => "Wait",
        }
    }

    /// JQL filter for issues in this status. "To Do" also covers issues
    /// that are ready for development.
    pub fn jql(self) -> String {
        match self {
            Status::Todo => format!(
                "status='{}' OR status='{}'",
                Status::Todo.jira_name(),
                Status::DevReady.jira_name()
            ),
            other => format!("status='{}'", other.jira_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRow {
    pub key: String,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub issue_type: String,
    pub summary: String,
}

impl IssueRow {
    fn from_issue(issue: &Issue) -> Self {
        let fields = &issue.fields;
        IssueRow {
            key: issue.key.clone(),
            assignee: fields.assignee.as_ref().map(|u| u.first_name().to_string()),
            reporter: fields.reporter.as_ref().map(|u| u.first_name().to_string()),
            issue_type: fields
                .issuetype
                .as_ref()
                .map(|t| t.name.to_uppercase())
                .unwrap_or_default(),
            summary: fields.summary.clone().unwrap_or_default(),
        }
    }
}

/// Issues of the active sprint in `status`, unassigned first, then by assignee.
pub fn sprint_issues<A: JiraApi>(api: &A, board_id: u64, status: Status) -> Result<Vec<IssueRow>> {
    let sprints = api.active_sprint(board_id)?;
    let sprint = match sprints.values.first() {
        Some(s) => s,
        None => bail!("Board {} has no active sprint", board_id),
    };

    let search = api.sprint_issues(sprint.id, &status.jql())?;
    let mut rows: Vec<IssueRow> = search.issues.iter().map(IssueRow::from_issue).collect();
    rows.sort_by(|a, b| a.assignee.cmp(&b.assignee));
    Ok(rows)
}

pub fn list<A: JiraApi>(api: &A, board_id: u64, status: Status) -> Result<()> {
    let rows = sprint_issues(api, board_id, status)?;
    println!("Issues in {}", status.jira_name());
    if rows.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    for row in rows {
        println!(
            "{:<12} {:<10} {:<12} {:<12} {}",
            row.key,
            row.issue_type,
            row.assignee.as_deref().unwrap_or("-"),
            row.reporter.as_deref().unwrap_or("-"),
            truncate(&row.summary, 60)
        );
    }
    Ok(())
}

/// Moves an issue through the workflow. Moving to In Progress also assigns
/// it to the current user.
pub fn move_to<A: JiraApi>(api: &A, issue_key: &str, status: Status) -> Result<()> {
    let target = status.jira_name();
    let list = api.transitions(issue_key)?;
    let transition = match list.transitions.iter().find(|t| t.name == target) {
        Some(t) => t,
        None => {
            let available: Vec<&str> = list.transitions.iter().map(|t| t.name.as_str()).collect();
            bail!(
                "{} cannot be moved to {}. Available: {}",
                issue_key,
                target,
                available.join(", ")
            );
        }
    };

    api.set_transition(issue_key, &transition.id)?;
    if status == Status::Progress {
        let me = api.current_user()?;
        api.assign_issue(issue_key, &me.account_id)?;
    }
    println!("Moved {} to {}", issue_key, target);
    Ok(())
}
