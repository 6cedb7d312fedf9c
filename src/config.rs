//! Configuration management for packetview

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::column::{ColumnConfig, ColumnSpec};

/// Short reason for an I/O failure, for messages printed after the
/// terminal is restored
fn io_error_reason(e: &std::io::Error) -> Option<&'static str> {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::PermissionDenied => return Some("permission denied"),
        ErrorKind::NotFound => return Some("no such file or directory"),
        ErrorKind::WriteZero => return Some("disk full"),
        _ => {}
    }
    // ENOSPC, and EDQUOT on Linux and macOS
    #[cfg(unix)]
    {
        if matches!(e.raw_os_error(), Some(28 | 122 | 69)) {
            return Some("disk full");
        }
    }
    None
}

/// `context: reason` for an I/O error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    match io_error_reason(e) {
        Some(reason) => format!("{}: {}", context, reason),
        None => format!("{}: {}", context, e),
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Inbox backlog above which a warning is logged (default: 10000)
    #[serde(default = "default_inbox_warn_depth")]
    pub inbox_warn_depth: usize,

    /// Theme preset: "dark" (default) or "light"
    #[serde(default = "default_theme_preset")]
    pub theme_preset: String,

    /// Height of a shown details panel in percent (default: 30)
    #[serde(default = "default_details_height_percent")]
    pub details_height_percent: u16,

    /// Ask before quitting (default: true)
    #[serde(default = "default_confirm_quit")]
    pub confirm_quit: bool,

    /// Column layouts per packet class, added to the built-in ones
    ///
    /// ```toml
    /// [[columns.CAN]]
    /// name = "ID"
    /// width = 5
    /// field = "identifier"
    /// format = "hex"
    /// ```
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<ColumnSpec>>,
}

fn default_inbox_warn_depth() -> usize {
    10_000
}

fn default_theme_preset() -> String {
    "dark".to_string()
}

fn default_details_height_percent() -> u16 {
    30
}

fn default_confirm_quit() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inbox_warn_depth: default_inbox_warn_depth(),
            theme_preset: default_theme_preset(),
            details_height_percent: default_details_height_percent(),
            confirm_quit: default_confirm_quit(),
            columns: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        if config.details_height_percent > 100 {
            tracing::warn!(
                "details_height_percent {} is above 100, clamping",
                config.details_height_percent
            );
            config.details_height_percent = 100;
        }
        Ok(config)
    }

    /// Built-in column layouts plus the configured ones
    pub fn column_config(&self) -> ColumnConfig {
        ColumnConfig::default().with_overrides(&self.columns)
    }
}

/// Get the base configuration directory (~/.packetview)
/// Falls back to ./.packetview if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".packetview")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".packetview"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}
