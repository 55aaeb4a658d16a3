use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use jiralog::commands::{self, issue::Status, log::LogRequest, worklog::DEFAULT_LIST_LEN};
use jiralog::config::{default_db_path, Config};
use jiralog::db::Database;
use jiralog::issue_key::resolve as resolve_key;
use jiralog::jira::JiraClient;
use jiralog::sync::SyncEngine;

#[derive(Parser, Debug)]
#[command(name = "jiralog")]
#[command(about = "Track work time locally and log it to Jira")]
#[command(version)]
struct Cli {
    /// Config file (defaults to <config dir>/jiralog/config.toml)
    #[arg(long, env = "JIRALOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Session store (defaults to <data dir>/jiralog/db.json)
    #[arg(long, env = "JIRALOG_DB", global = true)]
    db: Option<PathBuf>,

    /// Diagnostic output format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask for missing Jira settings and write the config file
    #[command(alias = "init")]
    Setup,

    /// Show an issue with its description and comments
    #[command(visible_aliases = ["get", "view", "find", "i"])]
    Info {
        /// Issue key (defaults to the one in the current git branch)
        issue_key: Option<String>,
        /// Jira fields to fetch instead of the defaults
        fields: Vec<String>,
    },

    /// Start the timer for an issue
    Start {
        /// Issue key (defaults to the one in the current git branch)
        issue_key: Option<String>,
    },

    /// Stop the timer and log the time to Jira
    Stop {
        /// Worklog comment (asked for when missing)
        comment: Option<String>,
        /// Issue key (defaults to the one in the current git branch)
        issue_key: Option<String>,
    },

    /// Show timers that have not been logged yet
    Status,

    /// Log work for an activity preset or an issue key
    #[command(after_help = "Start times: 10:00, 10.00, 12 43, 3.00 p.m., 10:45am\n\
                            Time spent: 2h 15m, 30m, 4h, 1:30, 90")]
    Log {
        /// Activity from the config file, or an issue key
        target: String,
        /// When the work started (today)
        start_time: Option<String>,
        /// How long it took
        time_spent: Option<String>,
        /// Worklog comment
        comment: Option<String>,
    },

    /// Worklogs added through jiralog
    #[command(visible_alias = "wl")]
    Worklog {
        #[command(subcommand)]
        action: WorklogCommands,
    },

    /// Comments added through jiralog
    #[command(visible_alias = "cm")]
    Comment {
        #[command(subcommand)]
        action: CommentCommands,
    },

    /// Issues of the active sprint
    #[command(visible_alias = "is")]
    Issue {
        #[command(subcommand)]
        action: IssueCommands,
    },
}

#[derive(Subcommand, Debug)]
enum WorklogCommands {
    /// List the most recent worklogs
    List {
        /// Maximum number of worklogs to show
        #[arg(default_value_t = DEFAULT_LIST_LEN)]
        max: usize,
    },
    /// Delete a worklog in Jira and locally
    Del {
        /// Worklog id (defaults to the latest)
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CommentCommands {
    /// Add a comment to an issue
    Add {
        issue_key: String,
        comment: String,
        /// Name of a user to mention
        mention: Option<String>,
    },
    /// List the most recent comments
    List {
        #[arg(default_value_t = DEFAULT_LIST_LEN)]
        max: usize,
    },
    /// Delete a comment in Jira and locally
    Del {
        /// Comment id (defaults to the latest)
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum IssueCommands {
    /// List sprint issues in a status
    #[command(visible_alias = "ls")]
    List {
        #[arg(value_enum, default_value = "todo")]
        status: Status,
    },
    /// Move an issue to another status
    #[command(visible_alias = "mv")]
    Move {
        #[arg(value_enum)]
        status: Status,
        /// Issue key (defaults to the one in the current git branch)
        issue_key: Option<String>,
    },
}

fn install_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn config_path(cli: &Cli) -> Result<PathBuf> {
    cli.config
        .clone()
        .or_else(Config::default_path)
        .ok_or_else(|| anyhow!("Cannot locate a config directory; pass --config"))
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::load(&config_path(cli)?)
}

fn get_db(cli: &Cli) -> Result<Database> {
    let path = cli
        .db
        .clone()
        .or_else(default_db_path)
        .ok_or_else(|| anyhow!("Cannot locate a data directory; pass --db"))?;
    Database::open(&path).with_context(|| format!("Failed to open store at {}", path.display()))
}

fn get_client(config: &Config) -> Result<JiraClient> {
    let creds = config.jira.credentials()?;
    Ok(JiraClient::new(
        &creds.endpoint,
        &creds.username,
        &creds.api_token,
        creds.timeout,
    )?)
}

fn get_engine(cli: &Cli) -> Result<SyncEngine<JiraClient>> {
    let client = get_client(&load_config(cli)?)?;
    Ok(SyncEngine::new(get_db(cli)?, client))
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Setup => commands::setup::run(&config_path(&cli)?),

        Commands::Info { issue_key, fields } => {
            let key = resolve_key(issue_key.as_deref())?;
            let client = get_client(&load_config(&cli)?)?;
            commands::info::run(&client, &key, fields)
        }

        Commands::Start { issue_key } => {
            let key = resolve_key(issue_key.as_deref())?;
            let mut db = get_db(&cli)?;
            commands::timer::start(&mut db, &key)
        }

        Commands::Stop { comment, issue_key } => {
            let key = resolve_key(issue_key.as_deref())?;
            let mut engine = get_engine(&cli)?;
            commands::timer::stop(&mut engine, &key, comment.as_deref(), || {
                commands::prompt("Comment")
            })
        }

        Commands::Status => {
            let mut db = get_db(&cli)?;
            commands::timer::status(&mut db)
        }

        Commands::Log {
            target,
            start_time,
            time_spent,
            comment,
        } => {
            let config = load_config(&cli)?;
            let request = LogRequest::resolve(
                &config,
                target,
                start_time.as_deref(),
                time_spent.as_deref(),
                comment.as_deref(),
            )?;
            let mut engine = SyncEngine::new(get_db(&cli)?, get_client(&config)?);
            commands::log::run(&mut engine, &request, Local::now().date_naive())
        }

        Commands::Worklog { action } => match action {
            WorklogCommands::List { max } => commands::worklog::list(&mut get_db(&cli)?, *max),
            WorklogCommands::Del { id } => {
                commands::worklog::delete(&mut get_engine(&cli)?, id.as_deref())
            }
        },

        Commands::Comment { action } => match action {
            CommentCommands::Add {
                issue_key,
                comment,
                mention,
            } => {
                let key = resolve_key(Some(issue_key.as_str()))?;
                commands::comment::add(&mut get_engine(&cli)?, &key, comment, mention.as_deref())
            }
            CommentCommands::List { max } => commands::comment::list(&mut get_db(&cli)?, *max),
            CommentCommands::Del { id } => {
                commands::comment::delete(&mut get_engine(&cli)?, id.as_deref())
            }
        },

        Commands::Issue { action } => {
            let config = load_config(&cli)?;
            let client = get_client(&config)?;
            match action {
                IssueCommands::List { status } => {
                    let board_id = config.jira.credentials()?.board_id;
                    commands::issue::list(&client, board_id, *status)
                }
                IssueCommands::Move { status, issue_key } => {
                    let key = resolve_key(issue_key.as_deref())?;
                    commands::issue::move_to(&client, &key, *status)
                }
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_tracing(cli.log_format);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::report(&e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stop_with_comment_and_key() {
        let cli = Cli::parse_from(["jiralog", "stop", "Fixed the build", "PROJ-12"]);
        match cli.command {
            Commands::Stop { comment, issue_key } => {
                assert_eq!(comment.as_deref(), Some("Fixed the build"));
                assert_eq!(issue_key.as_deref(), Some("PROJ-12"));
            }
            _ => panic!("expected stop command"),
        }
    }

    #[test]
    fn parse_log_activity() {
        let cli = Cli::parse_from(["jiralog", "log", "standup", "8:45"]);
        match cli.command {
            Commands::Log {
                target,
                start_time,
                time_spent,
                ..
            } => {
                assert_eq!(target, "standup");
                assert_eq!(start_time.as_deref(), Some("8:45"));
                assert!(time_spent.is_none());
            }
            _ => panic!("expected log command"),
        }
    }

    #[test]
    fn parse_worklog_alias_defaults() {
        let cli = Cli::parse_from(["jiralog", "wl", "list"]);
        match cli.command {
            Commands::Worklog {
                action: WorklogCommands::List { max },
            } => assert_eq!(max, DEFAULT_LIST_LEN),
            _ => panic!("expected worklog list"),
        }
    }

    #[test]
    fn parse_issue_move() {
        let cli = Cli::parse_from(["jiralog", "is", "mv", "progress", "PROJ-3"]);
        match cli.command {
            Commands::Issue {
                action: IssueCommands::Move { status, issue_key },
            } => {
                assert_eq!(status, Status::Progress);
                assert_eq!(issue_key.as_deref(), Some("PROJ-3"));
            }
            _ => panic!("expected issue move"),
        }
    }

    #[test]
    fn parse_issue_list_defaults_to_todo() {
        let cli = Cli::parse_from(["jiralog", "issue", "ls"]);
        match cli.command {
            Commands::Issue {
                action: IssueCommands::List { status },
            } => assert_eq!(status, Status::Todo),
            _ => panic!("expected issue list"),
        }
    }

    #[test]
    fn parse_info_with_fields() {
        let cli = Cli::parse_from(["jiralog", "view", "PROJ-1", "summary", "status"]);
        match cli.command {
            Commands::Info { issue_key, fields } => {
                assert_eq!(issue_key.as_deref(), Some("PROJ-1"));
                assert_eq!(fields, vec!["summary", "status"]);
            }
            _ => panic!("expected info command"),
        }
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::parse_from(["jiralog", "status", "--db", "/tmp/db.json", "--log-format", "json"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/db.json")));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Cli::try_parse_from(["jiralog", "issue", "move", "someday"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
