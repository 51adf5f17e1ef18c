//! Admin PIN and session tokens.
//!
//! There is one admin credential: a numeric PIN stored as an Argon2 hash.
//! A successful login yields an HS256-signed token which the API layer puts
//! in an `HttpOnly` cookie.

use crate::{
    entities::{Admin, admin},
    errors::{Error, Result},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Shortest accepted PIN
pub const MIN_PIN_LEN: usize = 4;
/// Longest accepted PIN
pub const MAX_PIN_LEN: usize = 12;

const SESSION_SUBJECT: &str = "admin";

/// Checks that a PIN is 4 to 12 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<()> {
    let valid_len = (MIN_PIN_LEN..=MAX_PIN_LEN).contains(&pin.len());
    if !valid_len || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::validation(format!(
            "PIN must be {MIN_PIN_LEN} to {MAX_PIN_LEN} digits"
        )));
    }
    Ok(())
}

/// Hashes a PIN into an Argon2 PHC string.
pub fn hash_pin(pin: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PinHash {
            message: e.to_string(),
        })
}

/// Checks a PIN against a stored hash. A malformed hash never matches.
#[must_use]
pub fn verify_pin(pin: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

async fn get_admin(db: &DatabaseConnection) -> Result<Option<admin::Model>> {
    Admin::find().one(db).await.map_err(Into::into)
}

/// Creates the admin row from `initial_pin` when none exists yet.
///
/// Returns `true` when an admin was created.
pub async fn ensure_admin(db: &DatabaseConnection, initial_pin: Option<&str>) -> Result<bool> {
    if get_admin(db).await?.is_some() {
        return Ok(false);
    }
    let Some(pin) = initial_pin else {
        warn!("No admin account and ADMIN_PIN is not set; logins will fail");
        return Ok(false);
    };

    validate_pin(pin)?;
    admin::ActiveModel {
        pin_hash: Set(hash_pin(pin)?),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Admin account created from ADMIN_PIN");
    Ok(true)
}

/// Verifies a login PIN.
///
/// # Errors
/// [`Error::InvalidPin`] when the PIN is wrong or no admin exists.
pub async fn authenticate(db: &DatabaseConnection, pin: &str) -> Result<()> {
    let admin = get_admin(db).await?.ok_or(Error::InvalidPin)?;
    if verify_pin(pin.trim(), &admin.pin_hash) {
        Ok(())
    } else {
        Err(Error::InvalidPin)
    }
}

/// Replaces the admin PIN after checking the current one.
pub async fn change_pin(db: &DatabaseConnection, current_pin: &str, new_pin: &str) -> Result<()> {
    validate_pin(new_pin)?;
    let admin = get_admin(db).await?.ok_or(Error::InvalidPin)?;
    if !verify_pin(current_pin.trim(), &admin.pin_hash) {
        return Err(Error::InvalidPin);
    }

    let mut admin: admin::ActiveModel = admin.into();
    admin.pin_hash = Set(hash_pin(new_pin)?);
    admin.updated_at = Set(chrono::Utc::now());
    admin.update(db).await?;

    info!("Admin PIN changed");
    Ok(())
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Always `"admin"`
    pub sub: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Signs and verifies session tokens with a shared secret.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl SessionKeys {
    /// Builds keys from the secret; tokens live for `ttl_hours`.
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::hours(ttl_hours),
        }
    }

    /// Session lifetime in seconds, for the cookie's `Max-Age`.
    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issues a token for the admin.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn issue(&self) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = SessionClaims {
            sub: SESSION_SUBJECT.to_string(),
            exp: (now + self.ttl).timestamp().max(0) as usize,
            iat: now.timestamp() as usize,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding).map_err(Into::into)
    }

    /// Verifies a token's signature, expiry and subject.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &Validation::default())?;
        if data.claims.sub != SESSION_SUBJECT {
            return Err(Error::Unauthorized);
        }
        Ok(data.claims)
    }
}
