//! services/cli/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use coursework_core::{CourseId, FailurePolicy};
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub course_ids: Vec<CourseId>,
    pub api_base_url: String,
    pub client_secret_path: PathBuf,
    pub token_path: PathBuf,
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub log_level: Level,
    pub trace_log_path: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Courses ---
        let course_ids_str =
            lookup("COURSE_IDS").ok_or_else(|| ConfigError::MissingVar("COURSE_IDS".to_string()))?;
        let course_ids = parse_course_ids(&course_ids_str);
        if course_ids.is_empty() {
            return Err(ConfigError::InvalidValue(
                "COURSE_IDS".to_string(),
                "no course identifiers given".to_string(),
            ));
        }

        // --- Remote Service and Credentials ---
        let api_base_url = lookup("CLASSROOM_API_BASE")
            .unwrap_or_else(|| "https://classroom.googleapis.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let client_secret_path = lookup("CLIENT_SECRET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("client_secret.json"));
        let token_path = lookup("TOKEN_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("token.json"));

        // --- Fan-out Settings ---
        let max_concurrency_str = lookup("MAX_CONCURRENCY").unwrap_or_else(|| "8".to_string());
        let max_concurrency = match max_concurrency_str.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "MAX_CONCURRENCY".to_string(),
                    format!("'{}' is not a positive integer", max_concurrency_str),
                ))
            }
        };

        let policy_str = lookup("FAILURE_POLICY").unwrap_or_else(|| "fail-fast".to_string());
        let failure_policy = match policy_str.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" => FailurePolicy::FailFast,
            "continue" => FailurePolicy::Continue,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "FAILURE_POLICY".to_string(),
                    format!("'{}' is not one of fail-fast, continue", policy_str),
                ))
            }
        };

        // --- Logging ---
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;
        let trace_log_path = lookup("TRACE_LOG_PATH").map(PathBuf::from);

        Ok(Self {
            course_ids,
            api_base_url,
            client_secret_path,
            token_path,
            max_concurrency,
            failure_policy,
            log_level,
            trace_log_path,
        })
    }
}

fn parse_course_ids(raw: &str) -> Vec<CourseId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(CourseId::from)
        .collect()
}
