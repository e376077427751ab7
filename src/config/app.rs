//! Application configuration loading from config.toml
//!
//! Every field has a default, so a missing file or a partial file is fine. The
//! `DATABASE_URL` environment variable (possibly loaded from `.env`) wins over the file.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_VAR: &str = "LEDGER_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `SeaORM` connection string
    pub database_url: String,
    /// `tracing-subscriber` filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Baseline written into the settings row the first time it is created
    pub initial_baseline_balance: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            log_filter: "info".to_string(),
            initial_baseline_balance: 0,
        }
    }
}

impl AppConfig {
    /// Replaces the database URL when an override is present.
    #[must_use]
    pub fn with_database_url(mut self, database_url: Option<String>) -> Self {
        if let Some(url) = database_url.filter(|url| !url.trim().is_empty()) {
            self.database_url = url;
        }
        self
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or cannot be parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads the application configuration.
///
/// Reads the file named by `LEDGER_CONFIG` (default `./config.toml`), falling back to
/// defaults when it does not exist, then applies the `DATABASE_URL` override.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());

    let config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        AppConfig::default()
    };

    Ok(config.with_database_url(std::env::var("DATABASE_URL").ok()))
}
