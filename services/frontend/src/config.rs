//! services/frontend/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::FixedOffset;
use leafscan_core::HistoryFallback;
use std::net::SocketAddr;
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

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Base URL of the detection backend, without a trailing slash.
    pub api_base_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub request_timeout: Duration,
    /// Time zone history dates are shown and filtered in.
    pub history_zone: FixedOffset,
    pub history_fallback: HistoryFallback,
    pub camera_user_snapshot_url: Option<String>,
    pub camera_environment_snapshot_url: Option<String>,
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

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        // --- Detection Backend ---
        let api_base_url = var("API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("API_BASE_URL".to_string()))?
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }

        let timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", raw),
                )
            })?,
            None => 30,
        };

        // --- History View ---
        let offset_hours = match var("HISTORY_UTC_OFFSET_HOURS") {
            Some(raw) => raw.trim().parse::<i32>().map_err(|e| {
                ConfigError::InvalidValue("HISTORY_UTC_OFFSET_HOURS".to_string(), e.to_string())
            })?,
            None => 7,
        };
        let history_zone = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            ConfigError::InvalidValue(
                "HISTORY_UTC_OFFSET_HOURS".to_string(),
                format!("{} is outside -23..=23", offset_hours),
            )
        })?;

        let history_fallback = match var("HISTORY_FALLBACK") {
            Some(raw) => raw
                .parse::<HistoryFallback>()
                .map_err(|e| ConfigError::InvalidValue("HISTORY_FALLBACK".to_string(), e))?,
            None => HistoryFallback::default(),
        };

        // --- Camera Snapshot Sources (optional) ---
        let camera_user_snapshot_url = var("CAMERA_USER_SNAPSHOT_URL");
        let camera_environment_snapshot_url = var("CAMERA_ENVIRONMENT_SNAPSHOT_URL");

        Ok(Self {
            bind_address,
            api_base_url,
            log_level,
            cors_origin,
            request_timeout: Duration::from_secs(timeout_secs),
            history_zone,
            history_fallback,
            camera_user_snapshot_url,
            camera_environment_snapshot_url,
        })
    }
}
