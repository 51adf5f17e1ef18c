//! Unified error type for Fruit POS.
//!
//! Business functions in [`crate::core`] return [`Result`]; the HTTP layer
//! turns each variant into a status code and a `{ "error": ... }` body.

use thiserror::Error;

/// Every failure the application can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Request input failed validation
    #[error("{message}")]
    Validation {
        /// Human readable reason
        message: String,
    },

    /// A monetary amount was negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A row looked up by id does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record, e.g. `"order"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The operation collides with existing data
    #[error("{message}")]
    Conflict {
        /// Human readable reason
        message: String,
    },

    /// A stock movement would take a tracked item below zero
    #[error("Insufficient stock for '{item}': {available} available, {required} required")]
    InsufficientStock {
        /// Item name
        item: String,
        /// Stock on hand
        available: i64,
        /// Quantity the operation needs
        required: i64,
    },

    /// No valid admin session
    #[error("Authentication required")]
    Unauthorized,

    /// The admin PIN did not match
    #[error("Invalid PIN")]
    InvalidPin,

    /// Malformed CSV input
    #[error("CSV error on line {line}: {message}")]
    Csv {
        /// 1-based line number where the problem starts
        line: usize,
        /// What went wrong
        message: String,
    },

    /// PIN hashing failed
    #[error("PIN hashing error: {message}")]
    PinHash {
        /// Underlying error text
        message: String,
    },

    #[error("Database error: {0}")]
    /// Error bubbled up from `SeaORM`
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    /// Filesystem or socket error
    Io(#[from] std::io::Error),

    #[error("Session token error: {0}")]
    /// Session token could not be signed or verified
    Token(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
