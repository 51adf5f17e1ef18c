//! Application settings loaded from config.toml
//!
//! Every section is optional; missing keys fall back to the defaults below,
//! and a missing file means "all defaults".

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Session cookie settings
    pub auth: AuthConfig,
    /// Inventory thresholds
    pub inventory: InventoryConfig,
    /// Data seeded on startup
    pub seed: SeedConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// How long a login stays valid
    pub session_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "fruit_pos_session".to_string(),
            session_hours: 12,
        }
    }
}

/// `[inventory]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Tracked items at or below this stock show up on the dashboard
    pub low_stock_threshold: i64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
        }
    }
}

/// `[seed]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Category names created on startup when missing
    pub categories: Vec<String>,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from `FRUIT_POS_CONFIG`, or ./config.toml when unset.
/// Falls back to defaults when the file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("FRUIT_POS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        info!(path = %path, "No config file found, using defaults");
        return Ok(AppConfig::default());
    }
    load_config(&path)
}
