//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    AuthArgs, CliArgs, Command, ExportArgs, FilterArgs, LinkArgs, LinkSubject, ListArgs,
    RouteArgs, SettingsOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scm-audit-log";
const ENV_PREFIX: &str = "SCM_AUDIT_LOG";
const DEFAULT_INDEX_PATH: &str = "api/v2/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_PAGE_LIMIT: usize = 64;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Base URL of the host, always ending in `/`.
    pub url: Url,
    /// Index resource advertising the audit log links.
    pub index_url: Url,
    /// Prefix of viewer routes inside the host's web UI, empty or `/scm`-like.
    pub context_path: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub page_limit: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    url: Option<String>,
    index_path: Option<String>,
    context_path: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    page_limit: Option<usize>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(url) = overrides.server_url.as_ref() {
            self.server.url = Some(url.clone());
        }
        if let Some(path) = overrides.index_path.as_ref() {
            self.server.index_path = Some(path.clone());
        }
        if let Some(path) = overrides.context_path.as_ref() {
            self.server.context_path = Some(path.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.server.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache);

        Ok(Self {
            server,
            logging,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let raw_url = server
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            LoadError::invalid(
                "server.url",
                "is required (use --server-url or SCM_AUDIT_LOG__SERVER__URL)",
            )
        })?;

    let mut url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("server.url", format!("failed to parse: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(LoadError::invalid("server.url", "must be a base URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    let index_path = server
        .index_path
        .unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string());
    let index_url = url
        .join(index_path.trim_start_matches('/'))
        .map_err(|err| LoadError::invalid("server.index_path", format!("failed to join: {err}")))?;

    let context_path = server
        .context_path
        .map(|path| path.trim().trim_end_matches('/').to_string())
        .unwrap_or_default();
    if !context_path.is_empty() && !context_path.starts_with('/') {
        return Err(LoadError::invalid(
            "server.context_path",
            "must be empty or start with `/`",
        ));
    }

    let timeout_seconds = server.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "server.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        url,
        index_url,
        context_path,
        timeout: Duration::from_secs(timeout_seconds),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        page_limit: cache.page_limit.unwrap_or(DEFAULT_CACHE_PAGE_LIMIT).max(1),
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
