use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::path::Path;

use super::prompt_from;
use crate::config::{Config, JiraSettings};

fn question(setting: &str) -> &'static str {
    match setting {
        "endpoint" => "Jira URL (https://<your-site>.atlassian.net)",
        "username" => "Jira username (e-mail)",
        "api-token" => "Jira API token",
        "board-id" => "Board ID",
        _ => "Value",
    }
}

pub fn run(config_path: &Path) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if config.jira.missing().is_empty() {
        println!("Already set up ({}).", config_path.display());
        return Ok(());
    }

    let stdin = io::stdin();
    fill_missing(&mut config.jira, &mut stdin.lock())?;
    config.save(config_path)?;
    println!("Saved configuration to {}", config_path.display());
    Ok(())
}

/// Prompts until every required Jira setting has a value.
pub(crate) fn fill_missing(settings: &mut JiraSettings, input: &mut impl BufRead) -> Result<()> {
    loop {
        let missing = settings.missing();
        let Some(&name) = missing.first() else {
            return Ok(());
        };

        let answer = prompt_from(input, question(name))?;
        if answer.is_empty() {
            // EOF or an empty answer; stop instead of asking forever
            return settings
                .credentials()
                .map(|_| ())
                .context("Setup cancelled");
        }
        if let Err(e) = settings.set(name, &answer) {
            eprintln!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_fill_missing_asks_each_setting() {
        let mut settings = JiraSettings::default();
        let mut input = Cursor::new("https://x.atlassian.net/\nme@x.com\ntoken\nabc\n12\n");

        fill_missing(&mut settings, &mut input).unwrap();
        let creds = settings.credentials().unwrap();
        assert_eq!(creds.endpoint, "https://x.atlassian.net");
        assert_eq!(creds.username, "me@x.com");
        assert_eq!(creds.board_id, 12);
    }

    #[test]
    fn test_fill_missing_keeps_existing() {
        let mut settings = JiraSettings::default();
        settings.set("endpoint", "https://keep.me").unwrap();
        settings.set("username", "me").unwrap();
        let mut input = Cursor::new("token\n3\n");

        fill_missing(&mut settings, &mut input).unwrap();
        assert_eq!(settings.endpoint.as_deref(), Some("https://keep.me"));
        assert_eq!(settings.board_id, Some(3));
    }

    #[test]
    fn test_fill_missing_stops_at_eof() {
        let mut settings = JiraSettings::default();
        let mut input = Cursor::new("https://x\n");
        assert!(fill_missing(&mut settings, &mut input).is_err());
        assert_eq!(settings.endpoint.as_deref(), Some("https://x"));
    }

    #[test]
    fn test_run_when_configured_leaves_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        for (k, v) in [("endpoint", "https://x"), ("username", "u"), ("api-token", "t"), ("board-id", "1")] {
            config.jira.set(k, v).unwrap();
        }
        config.save(&path).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        run(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }
}
