/// Database configuration and connection management
pub mod database;

/// Secrets read from environment variables
pub mod secrets;

/// Application settings loaded from config.toml
pub mod settings;

pub use settings::{AppConfig, load_default_config};
