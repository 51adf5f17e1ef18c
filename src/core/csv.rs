//! Minimal CSV reader and writer.
//!
//! The writer quotes only when needed and prefixes output with a UTF-8 BOM so
//! spreadsheet applications pick the right encoding. Phone numbers are written
//! as `="<digits>"` formulas so spreadsheets keep them as text.
//!
//! The reader handles quoted fields, doubled quotes, separators and line
//! breaks inside quotes, CRLF or LF line endings, and a leading BOM.

use crate::errors::{Error, Result};
use std::borrow::Cow;

/// Byte-order mark written at the start of every export
pub const BOM: char = '\u{feff}';

/// Quotes a field when it contains a separator, quote, line break, or
/// leading/trailing whitespace. Embedded quotes are doubled.
#[must_use]
pub fn escape_field(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.contains([',', '"', '\r', '\n'])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Wraps digits as a spreadsheet text formula: `="6281234"`.
#[must_use]
pub fn excel_text(digits: &str) -> String {
    format!("=\"{digits}\"")
}

/// Undoes [`excel_text`]; other values pass through trimmed.
#[must_use]
pub fn strip_excel_text(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("=\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
}

/// Builds a CSV document row by row.
#[derive(Debug)]
pub struct CsvWriter {
    buffer: String,
}

impl CsvWriter {
    /// Starts a document with a BOM and the given header row.
    #[must_use]
    pub fn with_header(header: &[&str]) -> Self {
        let mut writer = Self {
            buffer: String::from(BOM),
        };
        writer.write_row(header.iter().copied());
        writer
    }

    /// Appends one row, escaping each field.
    pub fn write_row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (index, field) in fields.into_iter().enumerate() {
            if index > 0 {
                self.buffer.push(',');
            }
            self.buffer.push_str(&escape_field(field.as_ref()));
        }
        self.buffer.push_str("\r\n");
    }

    /// Returns the finished document.
    #[must_use]
    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Parses CSV text into rows of fields. Blank lines are skipped.
///
/// # Errors
/// Returns [`Error::Csv`] when a quoted field is never closed.
pub fn parse(input: &str) -> Result<Vec<Vec<String>>> {
    let input = input.strip_prefix(BOM).unwrap_or(input);

    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_started_on = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_started_on = line;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                finish_row(&mut rows, &mut row, &mut field);
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Csv {
            line: quote_started_on,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() {
        finish_row(&mut rows, &mut row, &mut field);
    }

    Ok(rows)
}

fn finish_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    row.push(std::mem::take(field));
    let blank = row.len() == 1 && row[0].is_empty();
    if blank {
        row.clear();
    } else {
        rows.push(std::mem::take(row));
    }
}
