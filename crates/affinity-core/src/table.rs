//! Minimal delimited-text reader with comma/semicolon detection.
//!
//! The first non-blank line is the header; its names are kept for display
//! only and never interpreted. Fields are trimmed. A field wrapped in double
//! quotes may contain the delimiter, and `""` inside quotes is a literal
//! quote. A quote left open at the end of its line is an
//! [`UnterminatedQuote`] error.
//!
//! ## Delimiter detection
//!
//! Comma is tried first. If the comma header has fewer than
//! [`EXPECTED_COLUMNS`] columns, semicolon is tried and wins when it yields
//! more columns.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

/// Column count of a well-formed subject/item/weight table.
pub const EXPECTED_COLUMNS: usize = 3;

/// Field separators accepted by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    /// The separator character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Semicolon => ';',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comma => f.write_str("comma"),
            Self::Semicolon => f.write_str("semicolon"),
        }
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comma" | "," => Ok(Self::Comma),
            "semicolon" | ";" => Ok(Self::Semicolon),
            other => Err(format!("unknown delimiter '{other}': expected comma or semicolon")),
        }
    }
}

/// A quoted field was still open at the end of its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: unterminated quoted field")]
pub struct UnterminatedQuote {
    /// 1-based line number in the source text.
    pub line: usize,
}

/// One data line of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number in the source text.
    pub line: usize,
    pub fields: Vec<String>,
}

/// A parsed delimited table: header plus data records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub delimiter: Delimiter,
    pub header: Vec<String>,
    pub records: Vec<Record>,
}

impl RawTable {
    /// Parse `text` with a fixed delimiter.
    ///
    /// Blank lines are skipped. Empty input yields an empty header and no
    /// records.
    ///
    /// # Errors
    ///
    /// Returns [`UnterminatedQuote`] for the first line whose quoted field
    /// never closes.
    pub fn parse(text: &str, delimiter: Delimiter) -> Result<Self, UnterminatedQuote> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let header = lines
            .next()
            .map(|(line, raw)| split_record(raw, delimiter).ok_or(UnterminatedQuote { line }))
            .transpose()?
            .unwrap_or_default();

        let records = lines
            .map(|(line, raw)| {
                split_record(raw, delimiter)
                    .map(|fields| Record { line, fields })
                    .ok_or(UnterminatedQuote { line })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            delimiter,
            header,
            records,
        })
    }

    /// Parse `text`, choosing between comma and semicolon.
    ///
    /// # Errors
    ///
    /// Returns [`UnterminatedQuote`] when neither delimiter yields a usable
    /// table and the comma reading hit an open quote.
    pub fn detect(text: &str) -> Result<Self, UnterminatedQuote> {
        let comma = Self::parse(text, Delimiter::Comma);
        if comma
            .as_ref()
            .is_ok_and(|t| t.column_count() >= EXPECTED_COLUMNS)
        {
            return comma;
        }

        let semicolon = Self::parse(text, Delimiter::Semicolon);
        debug!(
            comma_ok = comma.is_ok(),
            semicolon_ok = semicolon.is_ok(),
            "comma header too narrow, trying semicolon"
        );
        match (comma, semicolon) {
            (Ok(comma), Ok(semicolon)) => {
                if semicolon.column_count() > comma.column_count() {
                    Ok(semicolon)
                } else {
                    Ok(comma)
                }
            }
            (Ok(table), Err(_)) => Ok(table),
            (Err(_), Ok(table)) if table.column_count() > 1 => Ok(table),
            (Err(e), _) => Err(e),
        }
    }

    /// Number of columns declared by the header.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Returns `true` if the table has no data records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Split one line into trimmed fields, honoring double-quoted fields.
///
/// Returns `None` if a quoted field is still open at the end of the line.
#[must_use]
pub fn split_record(line: &str, delimiter: Delimiter) -> Option<Vec<String>> {
    let sep = delimiter.as_char();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            c if c == sep && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return None;
    }
    fields.push(current.trim().to_string());
    Some(fields)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
