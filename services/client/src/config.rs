//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development. The remote service's endpoint
//! and public key are the only required variables; everything else has a
//! sensible default.

use std::path::PathBuf;
use tracing::Level;
use url::Url;

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
    /// Base URL of the remote backend (auth, rows, object storage).
    pub supabase_url: Url,
    /// The backend's public (anon) API key, sent with every request.
    pub supabase_anon_key: String,
    pub log_level: Level,
    /// Object-storage bucket for photo uploads.
    pub storage_bucket: String,
    /// Where the persisted credential (refresh token) lives between runs.
    pub session_file: PathBuf,
    /// Best-effort preference persistence.
    pub prefs_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure
    /// tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Remote Service Endpoint and Key ---
        let supabase_url_str = std::env::var("SUPABASE_URL")
            .map_err(|_| ConfigError::MissingVar("SUPABASE_URL".to_string()))?;
        let supabase_url = supabase_url_str
            .parse::<Url>()
            .map_err(|e| ConfigError::InvalidValue("SUPABASE_URL".to_string(), e.to_string()))?;

        let supabase_anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| ConfigError::MissingVar("SUPABASE_ANON_KEY".to_string()))?;

        // --- Logging ---
        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Local Paths and Storage Settings ---
        let storage_bucket =
            std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "bedtijd-photos".to_string());

        let session_file = std::env::var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./session.json"));

        let prefs_path = std::env::var("PREFS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prefs.json"));

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            log_level,
            storage_bucket,
            session_file,
            prefs_path,
        })
    }
}
