//! Track time on Jira issues locally and push it as worklogs.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod issue_key;
pub mod jira;
pub mod models;
pub mod sync;
pub mod timeparse;
