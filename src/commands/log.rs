use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, NaiveDate};

use crate::config::Config;
use crate::issue_key;
use crate::jira::JiraApi;
use crate::models::WorklogEntry;
use crate::sync::SyncEngine;
use crate::timeparse::{format_duration, parse_clock_time, parse_duration_to_seconds, ParseError};

/// What to log, after activity presets and command line values are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub issue_key: String,
    pub start_time: String,
    pub time_spent: String,
    pub comment: String,
}

impl LogRequest {
    /// `target` is an activity name from the config or an issue key.
    /// Values given on the command line win over the preset.
    pub fn resolve(
        config: &Config,
        target: &str,
        start_time: Option<&str>,
        time_spent: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Self> {
        if let Some(activity) = config.activity(target) {
            return Ok(LogRequest {
                issue_key: activity.issue_key.clone(),
                start_time: start_time.unwrap_or(activity.start_time.as_str()).to_string(),
                time_spent: time_spent.unwrap_or(activity.time_spent.as_str()).to_string(),
                comment: comment.unwrap_or(activity.comment.as_str()).to_string(),
            });
        }

        let issue_key = match issue_key::normalize(target) {
            Some(key) => key,
            None => {
                let known: Vec<&str> = config.activities.keys().map(String::as_str).collect();
                bail!(
                    "'{}' is neither an activity nor an issue key. Activities: {}",
                    target,
                    if known.is_empty() { "(none configured)".to_string() } else { known.join(", ") }
                );
            }
        };
        let start_time = start_time.ok_or_else(|| anyhow!("Start time is required when logging on an issue key"))?;
        let time_spent = time_spent.ok_or_else(|| anyhow!("Time spent is required when logging on an issue key"))?;

        Ok(LogRequest {
            issue_key,
            start_time: start_time.to_string(),
            time_spent: time_spent.to_string(),
            comment: comment.unwrap_or_default().to_string(),
        })
    }

    /// Start instant on `date` and duration in seconds.
    pub fn times(&self, date: NaiveDate) -> Result<(DateTime<Local>, i64), ParseError> {
        let started = parse_clock_time(&self.start_time, date)?;
        let seconds = parse_duration_to_seconds(&self.time_spent)?;
        Ok((started, seconds))
    }

    /// Parses the times on `date` and pushes the worklog.
    pub fn submit<A: JiraApi>(&self, engine: &mut SyncEngine<A>, date: NaiveDate) -> Result<WorklogEntry> {
        let (started, seconds) = self.times(date)?;
        Ok(engine.log_work(&self.issue_key, &self.comment, &started, seconds)?)
    }
}

pub fn run<A: JiraApi>(engine: &mut SyncEngine<A>, request: &LogRequest, date: NaiveDate) -> Result<()> {
    let entry = request.submit(engine, date)?;
    println!(
        "Logged {} on {} starting {}",
        format_duration(entry.time_spent_seconds),
        request.issue_key,
        request.start_time
    );
    println!("Worklog id: {}", entry.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::sync::fake::FakeJira;
    use crate::timeparse::to_api_timestamp;
    use chrono::{TimeZone, Timelike};
    use tempfile::tempdir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    #[test]
    fn test_activity_preset() {
        let config = Config::template().unwrap();
        let request = LogRequest::resolve(&config, "standup", None, None, None).unwrap();
        let preset = config.activity("standup").unwrap();
        assert_eq!(request.issue_key, preset.issue_key);
        assert_eq!(request.time_spent, preset.time_spent);
        assert_eq!(request.comment, preset.comment);
    }

    #[test]
    fn test_template_presets_parse() {
        let config = Config::template().unwrap();
        for name in config.activities.keys() {
            let request = LogRequest::resolve(&config, name, None, None, None).unwrap();
            assert!(request.times(date()).is_ok(), "preset {} failed", name);
        }
    }

    #[test]
    fn test_times_with_meridiem() {
        let request = LogRequest {
            issue_key: "PROJ-1".to_string(),
            start_time: "2 p.m".to_string(),
            time_spent: "1h 50m".to_string(),
            comment: String::new(),
        };
        let (started, seconds) = request.times(date()).unwrap();
        assert_eq!(started.hour(), 14);
        assert_eq!(seconds, 6600);
    }

    #[test]
    fn test_arguments_override_preset() {
        let config = Config::template().unwrap();
        let request =
            LogRequest::resolve(&config, "standup", Some("9:00"), Some("30m"), Some("Long one")).unwrap();
        assert_eq!(request.start_time, "9:00");
        assert_eq!(request.time_spent, "30m");
        assert_eq!(request.comment, "Long one");
    }

    #[test]
    fn test_issue_key_needs_times() {
        let config = Config::default();
        assert!(LogRequest::resolve(&config, "proj-4", None, None, None).is_err());
        assert!(LogRequest::resolve(&config, "proj-4", Some("10:00"), None, None).is_err());

        let request = LogRequest::resolve(&config, "proj-4", Some("10:00"), Some("2h 15m"), None).unwrap();
        assert_eq!(request.issue_key, "PROJ-4");
        assert_eq!(request.comment, "");
    }

    #[test]
    fn test_unknown_target() {
        let config = Config::default();
        let err = LogRequest::resolve(&config, "lunch", None, None, None).unwrap_err();
        assert!(err.to_string().contains("neither an activity nor an issue key"));
    }

    #[test]
    fn test_submit_pushes_parsed_times() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db.json")).unwrap();
        let mut engine = SyncEngine::new(db, FakeJira::default());

        let request = LogRequest {
            issue_key: "PROJ-1".to_string(),
            start_time: "2 p.m.".to_string(),
            time_spent: "1h 50m".to_string(),
            comment: "Sprint review".to_string(),
        };
        let entry = request.submit(&mut engine, date()).unwrap();

        let expected_start = Local.with_ymd_and_hms(2024, 6, 12, 14, 0, 0).earliest().unwrap();
        assert_eq!(entry.time_spent_seconds, 6600);
        assert_eq!(entry.started, to_api_timestamp(&expected_start));
        assert!(run(&mut engine, &request, date()).is_ok());
        assert_eq!(engine.db().list_worklogs(10).len(), 2);
    }

    #[test]
    fn test_bad_time_pushes_nothing() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db.json")).unwrap();
        let mut engine = SyncEngine::new(db, FakeJira::default());

        let request = LogRequest {
            issue_key: "PROJ-1".to_string(),
            start_time: "25:00".to_string(),
            time_spent: "1h".to_string(),
            comment: String::new(),
        };
        assert!(request.submit(&mut engine, date()).is_err());
        assert!(engine.api().added_worklogs.borrow().is_empty());
    }
}
