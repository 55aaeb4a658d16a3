//! jiralog configuration.
//!
//! Loaded from `<config dir>/jiralog/config.toml` unless `--config` points
//! elsewhere. A missing file behaves like the bundled template; `jiralog
//! setup` writes the real one.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TEMPLATE: &str = include_str!("../resources/config.toml");
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub jira: JiraSettings,
    /// Presets for `jiralog log <activity>`.
    #[serde(default)]
    pub activities: BTreeMap<String, Activity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JiraSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Everything needed to talk to Jira, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraCredentials {
    pub endpoint: String,
    pub username: String,
    pub api_token: String,
    pub board_id: u64,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Activity {
    pub issue_key: String,
    pub comment: String,
    pub time_spent: String,
    pub start_time: String,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("jiralog").join("config.toml"))
    }

    pub fn template() -> Result<Self> {
        toml::from_str(DEFAULT_TEMPLATE).context("Bundled config template is invalid")
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::template();
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config at {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn activity(&self, name: &str) -> Option<&Activity> {
        self.activities.get(name)
    }
}

impl JiraSettings {
    /// Names of required settings that are unset or blank.
    pub fn missing(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.endpoint) {
            missing.push("endpoint");
        }
        if blank(&self.username) {
            missing.push("username");
        }
        if blank(&self.api_token) {
            missing.push("api-token");
        }
        if self.board_id.is_none() {
            missing.push("board-id");
        }
        missing
    }

    pub fn credentials(&self) -> Result<JiraCredentials> {
        let missing = self.missing();
        if !missing.is_empty() {
            bail!(
                "Missing Jira settings: {}. Run 'jiralog setup' first.",
                missing.join(", ")
            );
        }

        let take = |v: &Option<String>, name: &str| {
            v.clone()
                .ok_or_else(|| anyhow!("Missing Jira setting: {}", name))
        };
        Ok(JiraCredentials {
            endpoint: take(&self.endpoint, "endpoint")?,
            username: take(&self.username, "username")?,
            api_token: take(&self.api_token, "api-token")?,
            board_id: self
                .board_id
                .ok_or_else(|| anyhow!("Missing Jira setting: board-id"))?,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// Stores a setup answer under its kebab-case name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match name {
            "endpoint" => self.endpoint = Some(value.trim_end_matches('/').to_string()),
            "username" => self.username = Some(value.to_string()),
            "api-token" => self.api_token = Some(value.to_string()),
            "board-id" => {
                let id = value
                    .parse()
                    .map_err(|_| anyhow!("Board ID should be a number, got '{}'", value))?;
                self.board_id = Some(id);
            }
            other => bail!("Unknown Jira setting '{}'", other),
        }
        Ok(())
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("jiralog").join("db.json"))
}
