use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::error::DomainError;
use crate::domain::filters::{FilterKey, FilterState};
use crate::domain::subjects::Subject;

/// Command-line arguments for the `scm-audit-log` binary.
#[derive(Debug, Parser)]
#[command(
    name = "scm-audit-log",
    version,
    about = "Browse and export the SCM-Manager audit log"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SCM_AUDIT_LOG_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the SCM-Manager base URL, e.g. <https://scm.example/scm>.
    #[arg(long = "server-url", value_name = "URL", value_hint = ValueHint::Url)]
    pub server_url: Option<String>,

    /// Override the index resource path relative to the server URL.
    #[arg(long = "server-index-path", value_name = "PATH")]
    pub index_path: Option<String>,

    /// Override the context path prefixed to viewer routes.
    #[arg(long = "server-context-path", value_name = "PATH")]
    pub context_path: Option<String>,

    /// Override the request timeout.
    #[arg(long = "server-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct AuthArgs {
    /// Path to file containing API key (takes precedence over env)
    #[arg(
        long = "key-file",
        env = "SCM_AUDIT_LOG_API_KEY_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub key_file: Option<PathBuf>,

    /// API key from env (CLI flag intentionally hidden to avoid shell history leaks)
    #[arg(long = "api-key", hide = true, env = "SCM_AUDIT_LOG_API_KEY")]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Show one page of the audit log.
    List(ListArgs),
    /// Download the filtered audit log as CSV.
    Export(ExportArgs),
    /// Print the pre-filtered viewer route for a user, group or repository.
    Link(LinkArgs),
    /// Resolve a viewer route such as `/admin/audit-log/2?label=user` and show it.
    Route(RouteArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct FilterArgs {
    /// Only entries about this entity.
    #[arg(long, value_name = "ENTITY")]
    pub entity: Option<String>,

    /// Only entries caused by this user.
    #[arg(long, value_name = "USER")]
    pub username: Option<String>,

    /// Only entries carrying this label.
    #[arg(long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Only entries of this kind (created|modified|deleted).
    #[arg(long, value_name = "ACTION")]
    pub action: Option<String>,

    /// Only entries on or after this date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Only entries on or before this date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> Result<FilterState, DomainError> {
        let pairs = [
            (FilterKey::Entity, &self.entity),
            (FilterKey::Username, &self.username),
            (FilterKey::Label, &self.label),
            (FilterKey::Action, &self.action),
            (FilterKey::From, &self.from),
            (FilterKey::To, &self.to),
        ];
        pairs
            .into_iter()
            .try_fold(FilterState::new(), |state, (key, value)| match value {
                Some(value) => state.with(key, value.as_str()),
                None => Ok(state),
            })
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// Page to show (1-based).
    #[arg(value_name = "PAGE")]
    pub page: Option<NonZeroU32>,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Print the page as JSON instead of text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Directory the CSV file is written to.
    #[arg(
        long = "out-dir",
        value_name = "DIR",
        default_value = ".",
        value_hint = ValueHint::DirPath
    )]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct LinkArgs {
    #[command(subcommand)]
    pub subject: LinkSubject,
}

#[derive(Debug, Subcommand, Clone)]
pub enum LinkSubject {
    /// Entries about a user.
    User { name: String },
    /// Entries about a group.
    Group { name: String },
    /// Entries about a repository.
    Repository {
        #[arg(value_name = "NAMESPACE/NAME")]
        repository: String,
    },
}

impl LinkSubject {
    pub fn to_subject(&self) -> Result<Subject, DomainError> {
        match self {
            LinkSubject::User { name } => Ok(Subject::User(name.clone())),
            LinkSubject::Group { name } => Ok(Subject::Group(name.clone())),
            LinkSubject::Repository { repository } => match repository.split_once('/') {
                Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                    Ok(Subject::Repository {
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                    })
                }
                _ => Err(DomainError::validation(format!(
                    "repository must be given as NAMESPACE/NAME (got `{repository}`)"
                ))),
            },
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct RouteArgs {
    /// Viewer route, optionally with the filter query.
    #[arg(value_name = "ROUTE")]
    pub route: String,

    /// Print the page as JSON instead of text.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}
