//! Configuration Module
//!
//! TOML configuration for the database target, the shell and logging.

use crate::core::{MoviesError, Result};
use crate::movies::DEFAULT_QUERY;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

const APP_DIR: &str = "moviesdb";

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database-related configuration.
#[derive(Debug, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Connection target descriptor, e.g. `sqlite:/home/me/movies.db`
    pub url: Option<String>,
}

/// UI-related configuration.
#[derive(Debug, Default, Deserialize)]
pub struct UIConfig {
    pub default_query: Option<String>,
    pub show_row_count: Option<bool>,
}

/// Logging configuration.
#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Config {
    /// The connection target to open: the configured URL, otherwise a
    /// `movies.db` file in the platform data directory.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.database.url {
            return Ok(url.clone());
        }
        let dir = dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .ok_or_else(|| MoviesError::Config("No data directory on this platform; set database.url".to_string()))?;
        fs::create_dir_all(&dir)?;
        Ok(format!("sqlite:{}", dir.join("movies.db").display()))
    }

    pub fn default_query(&self) -> &str {
        self.ui.default_query.as_deref().unwrap_or(DEFAULT_QUERY)
    }

    pub fn show_row_count(&self) -> bool {
        self.ui.show_row_count.unwrap_or(true)
    }

    /// Maximum log level, `warn` unless configured.
    pub fn log_level(&self) -> Result<Level> {
        match &self.logging.level {
            Some(level) => level
                .parse::<Level>()
                .map_err(|_| MoviesError::Config(format!("Invalid log level '{}'", level))),
            None => Ok(Level::WARN),
        }
    }
}

/// The default configuration file location, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| MoviesError::Config(e.to_string()))
}

/// Loads `explicit` if given, else the default file when it exists, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => Ok(Config::default()),
    }
}
