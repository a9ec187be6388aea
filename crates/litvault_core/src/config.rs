//! Process configuration.
//!
//! # Responsibility
//! - Read environment settings once at process start.
//! - Hand explicit settings to each component instead of ad hoc env reads.
//!
//! # Invariants
//! - A missing credential fails before any database or oracle work.
//! - The credential never appears in `Debug` output.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_KEY: &str = "LITVAULT_API_KEY";
pub const ENV_API_BASE: &str = "LITVAULT_API_BASE";
pub const ENV_MODEL: &str = "LITVAULT_MODEL";
pub const ENV_DB: &str = "LITVAULT_DB";
pub const ENV_LOG_LEVEL: &str = "LITVAULT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LITVAULT_LOG_DIR";
pub const ENV_MAX_DOCUMENT_CHARS: &str = "LITVAULT_MAX_DOCUMENT_CHARS";
pub const ENV_MAX_CONTEXT_CHARS: &str = "LITVAULT_MAX_CONTEXT_CHARS";
pub const ENV_TIMEOUT_SECS: &str = "LITVAULT_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_DB_PATH: &str = "literatures.db";
pub const DEFAULT_MAX_DOCUMENT_CHARS: usize = 60_000;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 48_000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration error. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingCredential(&'static str),
    InvalidValue {
        key: &'static str,
        value: String,
        message: String,
    },
    WorkingDirectory(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential(key) => {
                write!(f, "missing credential: set `{key}` in the environment or .env")
            }
            Self::InvalidValue {
                key,
                value,
                message,
            } => write!(f, "invalid value `{value}` for `{key}`: {message}"),
            Self::WorkingDirectory(message) => {
                write!(f, "cannot resolve working directory: {message}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Bearer credential for the oracle endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw secret, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub api_key: ApiKey,
    /// Base URL without the trailing `/chat/completions`.
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,
}

/// Whole-process configuration, built once in `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub oracle: OracleConfig,
    pub db_path: PathBuf,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    /// Extraction input cap in chars; longer documents are truncated.
    pub max_document_chars: usize,
    /// Context budget in chars for question answering.
    pub max_context_chars: usize,
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = read(ENV_API_KEY).ok_or(ConfigError::MissingCredential(ENV_API_KEY))?;
        let api_base = read(ENV_API_BASE)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = read(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = parse_positive(ENV_TIMEOUT_SECS, read(ENV_TIMEOUT_SECS))?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let max_document_chars =
            parse_positive(ENV_MAX_DOCUMENT_CHARS, read(ENV_MAX_DOCUMENT_CHARS))?
                .map_or(DEFAULT_MAX_DOCUMENT_CHARS, |value| value as usize);
        let max_context_chars = parse_positive(ENV_MAX_CONTEXT_CHARS, read(ENV_MAX_CONTEXT_CHARS))?
            .map_or(DEFAULT_MAX_CONTEXT_CHARS, |value| value as usize);

        Ok(Self {
            oracle: OracleConfig {
                api_key: ApiKey::new(api_key),
                api_base,
                model,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            db_path: read(ENV_DB).map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            log_level: read(ENV_LOG_LEVEL),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            max_document_chars,
            max_context_chars,
        })
    }

    /// Replaces the store location (CLI `--db`).
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// Absolute log directory: `LITVAULT_LOG_DIR`, else `<db parent>/logs`.
    pub fn resolved_log_dir(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.log_dir {
            Some(dir) => dir.clone(),
            None => self
                .db_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("logs"),
        };
        absolutize(dir)
    }
}

/// Loads `.env` from the working directory or its parents into the process environment.
pub fn load_dotenv() {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();
}

fn absolutize(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd =
        std::env::current_dir().map_err(|err| ConfigError::WorkingDirectory(err.to_string()))?;
    Ok(cwd.join(path))
}

fn parse_positive(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            message: "must be greater than zero".to_string(),
        }),
        Ok(value) => Ok(Some(value)),
        Err(err) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            message: err.to_string(),
        }),
    }
}
