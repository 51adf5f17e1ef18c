//! Secrets loaded from environment variables (usually via `.env`).
//!
//! These never live in config.toml so the file can be committed.

use crate::errors::{Error, Result};
use tracing::warn;

const DEV_SESSION_SECRET: &str = "fruit-pos-development-secret-change-me";

/// Gets the key used to sign session cookies from `SESSION_SECRET`.
///
/// Debug builds fall back to a fixed development key with a warning;
/// release builds refuse to start without one.
pub fn session_secret() -> Result<String> {
    match std::env::var("SESSION_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ if cfg!(debug_assertions) => {
            warn!("SESSION_SECRET not set, using the development secret");
            Ok(DEV_SESSION_SECRET.to_string())
        }
        _ => Err(Error::Config {
            message: "SESSION_SECRET must be set".to_string(),
        }),
    }
}

/// Gets the PIN used to create the admin account on first start, if configured.
#[must_use]
pub fn initial_admin_pin() -> Option<String> {
    std::env::var("ADMIN_PIN")
        .ok()
        .map(|pin| pin.trim().to_string())
        .filter(|pin| !pin.is_empty())
}
