//! services/app/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How the listing pulls tutors from the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchPolicy {
    /// One `fetch_all` up front, then paginate locally.
    FullFetch,
    /// Pull key-ordered pages on demand.
    CursorPaged,
}

impl FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(FetchPolicy::FullFetch),
            "paged" => Ok(FetchPolicy::CursorPaged),
            other => Err(format!("'{}' is not one of: full, paged", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub api_key: Option<String>,
    pub catalog_path: String,
    pub page_size: usize,
    pub fetch_policy: FetchPolicy,
    pub storage_path: PathBuf,
    pub booking_latency: Duration,
    pub log_level: Level,
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
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Hosted backend ---
        let database_url = lookup("FIREBASE_DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("FIREBASE_DATABASE_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = lookup("FIREBASE_API_KEY").filter(|k| !k.is_empty());
        let catalog_path = lookup("CATALOG_PATH")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| "teachers".to_string());

        // --- Listing ---
        let page_size = match lookup("PAGE_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "PAGE_SIZE".to_string(),
                        format!("'{}' is not a positive integer", raw),
                    ))
                }
            },
            None => 4,
        };
        let fetch_policy = lookup("FETCH_POLICY")
            .map(|raw| raw.parse::<FetchPolicy>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue("FETCH_POLICY".to_string(), e))?
            .unwrap_or(FetchPolicy::CursorPaged);

        // --- Local state ---
        let storage_path = lookup("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".learnlingo/storage.json"));
        let booking_latency_ms = match lookup("BOOKING_LATENCY_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("BOOKING_LATENCY_MS".to_string(), e.to_string())
            })?,
            None => 1000,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            database_url,
            api_key,
            catalog_path,
            page_size,
            fetch_policy,
            storage_path,
            booking_latency: Duration::from_millis(booking_latency_ms),
            log_level,
        })
    }
}
