//! Environment-driven settings for the advisory provider, evidence storage and
//! logging. Paths given on the command line win over anything here.

use crate::advisory::DEFAULT_BASE_URL;
use crate::evidence::DEFAULT_CAPACITY_BYTES;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub log_filter: String,
    pub gemini_api_key: Option<String>,
    pub advisory_model: String,
    pub advisory_base_url: String,
    pub advisory_timeout: Duration,
    pub evidence_dir: Option<PathBuf>,
    pub evidence_capacity_bytes: u64,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

impl Config {
    /// Reads the process environment, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let log_filter = non_empty_var("HARD75_LOG")
            .or_else(|| non_empty_var("RUST_LOG"))
            .unwrap_or_else(|| "warn".to_string());

        let advisory_timeout_secs = parse_var("HARD75_ADVISORY_TIMEOUT_SECS", 10u64)?;
        if advisory_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "HARD75_ADVISORY_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            log_filter,
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            advisory_model: non_empty_var("HARD75_ADVISORY_MODEL")
                .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            advisory_base_url: non_empty_var("HARD75_ADVISORY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            advisory_timeout: Duration::from_secs(advisory_timeout_secs),
            evidence_dir: non_empty_var("HARD75_EVIDENCE_DIR").map(PathBuf::from),
            evidence_capacity_bytes: parse_var(
                "HARD75_EVIDENCE_CAPACITY_BYTES",
                DEFAULT_CAPACITY_BYTES,
            )?,
        })
    }
}
