use reqwest::Url;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 9000;
const DEFAULT_LOG_FILE: &str = "webhook.log";
const DEFAULT_BUILD_URL: &str = "http://jenkins:8080";
const DEFAULT_BUILD_JOB: &str = "EmptyJob";
const DEFAULT_BUILD_USER: &str = "root";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Where and how to reach the build system.
#[derive(Debug, Clone)]
pub struct BuildServerConfig {
    pub base_url: Url,
    pub job_name: String,
    pub user: String,
    pub token: String,
    /// `None` keeps the outbound call unbounded.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Accepted for compatibility with existing deployments; signatures are not checked.
    pub secret: Option<String>,
    pub log_file: PathBuf,
    /// `None` buffers request bodies of any size.
    pub max_body_bytes: Option<usize>,
    pub build: BuildServerConfig,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get("BUILD_SERVER_URL").unwrap_or_else(|| DEFAULT_BUILD_URL.into());
        let base_url = Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            key: "BUILD_SERVER_URL",
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "BUILD_SERVER_URL",
                message: format!("{base_url} cannot be used as a base URL"),
            });
        }

        let build = BuildServerConfig {
            base_url,
            job_name: get("BUILD_JOB").unwrap_or_else(|| DEFAULT_BUILD_JOB.into()),
            user: get("BUILD_USER").unwrap_or_else(|| DEFAULT_BUILD_USER.into()),
            token: get("BUILD_TOKEN").ok_or(ConfigError::Missing("BUILD_TOKEN"))?,
            timeout: parse_opt::<u64>("BUILD_TIMEOUT_SECS", get("BUILD_TIMEOUT_SECS"))?
                .map(Duration::from_secs),
        };

        Ok(Self {
            host: get("WEBHOOK_HOST").unwrap_or_else(|| DEFAULT_HOST.into()),
            port: parse_opt("WEBHOOK_PORT", get("WEBHOOK_PORT"))?.unwrap_or(DEFAULT_PORT),
            secret: get("WEBHOOK_SECRET"),
            log_file: get("WEBHOOK_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            max_body_bytes: parse_opt("WEBHOOK_MAX_BODY_BYTES", get("WEBHOOK_MAX_BODY_BYTES"))?,
            build,
        })
    }
}

fn parse_opt<T>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                message: format!("{v:?}: {e}"),
            })
        })
        .transpose()
}
