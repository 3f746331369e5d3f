//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tracker/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tracker/` (~/.config/tracker/)
//! - Data: `$XDG_DATA_HOME/tracker/` (~/.local/share/tracker/)
//! - State/Logs: `$XDG_STATE_HOME/tracker/` (~/.local/state/tracker/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tracker";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Category handling
    #[serde(default)]
    pub categories: CategoriesConfig,

    /// Query engine behavior
    #[serde(default)]
    pub query: QueryConfig,

    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Category configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CategoriesConfig {
    /// Category that receives trackers whose category was deleted
    #[serde(default = "default_uncategorized_title")]
    pub uncategorized_title: String,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            uncategorized_title: default_uncategorized_title(),
        }
    }
}

fn default_uncategorized_title() -> String {
    "Uncategorized".to_string()
}

/// Query engine configuration
#[derive(Debug, Deserialize, Clone, Copy, Default)]
pub struct QueryConfig {
    /// Report filter changes as granular diffs instead of a full reload
    #[serde(default)]
    pub diff_filter_changes: bool,
}

/// Database configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Override for the database file location
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values that serde cannot check
    pub fn validate(&self) -> Result<()> {
        if self.categories.uncategorized_title.trim().is_empty() {
            return Err(Error::Config(
                "categories.uncategorized_title must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tracker/config.toml` (~/.config/tracker/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/tracker/` (~/.local/share/tracker/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join(APP_DIR)
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tracker/` (~/.local/state/tracker/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/tracker/tracker.db` (~/.local/share/tracker/tracker.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("tracker.db")
    }

    /// Database path honoring the `[database] path` override
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/tracker/tracker.log` (~/.local/state/tracker/tracker.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tracker.log")
    }
}
