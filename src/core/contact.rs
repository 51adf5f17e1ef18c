//! Contact fields shared by customers and sellers.
//!
//! Both parties are keyed by their WhatsApp number, so every number is
//! normalized to digits with the Indonesian `62` country code before it is
//! stored or compared.

use crate::errors::{Error, Result};
use serde::Deserialize;

/// Indonesian country calling code
const COUNTRY_CODE: &str = "62";

/// Name, number and address as submitted by a form or CSV row
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactInput {
    /// Display name
    pub name: String,
    /// WhatsApp number in any common format
    #[serde(default)]
    pub whatsapp: Option<String>,
    /// Address
    #[serde(default)]
    pub address: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated contact, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Trimmed display name
    pub name: String,
    /// Normalized number, `None` when blank
    pub whatsapp: Option<String>,
    /// Trimmed address, `None` when blank
    pub address: Option<String>,
    /// Trimmed notes, `None` when blank
    pub notes: Option<String>,
}

impl ContactInput {
    /// Trims and normalizes the input.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the name is blank.
    pub fn validate(self) -> Result<Contact> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("Name cannot be empty"));
        }

        Ok(Contact {
            name,
            whatsapp: self.whatsapp.as_deref().and_then(normalize_whatsapp),
            address: clean_text(self.address),
            notes: clean_text(self.notes),
        })
    }
}

/// Normalizes a WhatsApp number to digits with the `62` country code.
///
/// `0812…` and `812…` become `62812…`; `+62 812-…` becomes `62812…`.
/// Returns `None` when no digits remain.
#[must_use]
pub fn normalize_whatsapp(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let normalized = if digits.starts_with(COUNTRY_CODE) {
        digits
    } else if let Some(local) = digits.strip_prefix('0') {
        format!("{COUNTRY_CODE}{local}")
    } else if digits.starts_with('8') {
        format!("{COUNTRY_CODE}{digits}")
    } else {
        digits
    };
    Some(normalized)
}

/// Trims optional free text, mapping blank strings to `None`.
#[must_use]
pub fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
