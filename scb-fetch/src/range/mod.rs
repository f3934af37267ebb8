//! Spreadsheet range addresses
//!
//! Parses `[Sheet!]Column Row[:Column Row]` range strings into a
//! [`RangeAddress`]. Parsing is best-effort: a failure is reported as a
//! [`RangeParseError`] and callers pick their own fallback (usually the
//! configured default [`RowWindow`]) instead of aborting the batch.

pub mod batch;
pub mod reconcile;

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

pub use batch::{BatchPlan, BatchRequestBuilder, RangeRole, RoleTaggedRange};
pub use reconcile::{EchoedRange, Matrix, Reconciler};

static CELL_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)(\d+)(?::([A-Za-z]+)(\d+))?$").expect("static range pattern")
});

static R1C1_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[Rr]\d+[Cc]\d+$").expect("static R1C1 pattern"));

/// Range parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("empty range")]
    Empty,

    #[error("unrecognized range syntax: {0}")]
    Malformed(String),

    #[error("row out of range in {0}")]
    InvalidRow(String),
}

/// Parsed range: optional sheet, start column and inclusive 1-based rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeAddress {
    /// Sheet name with quoting removed
    pub sheet: Option<String>,
    /// Start column letters, upper-cased
    pub column: String,
    pub start_row: u32,
    pub end_row: u32,
}

impl RangeAddress {
    pub fn rows(&self) -> RowWindow {
        RowWindow {
            start: self.start_row,
            end: self.end_row,
        }
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reference = format!("{}{}:{}{}", self.column, self.start_row, self.column, self.end_row);
        f.write_str(&qualify(self.sheet.as_deref(), &reference))
    }
}

/// Inclusive 1-based row interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub start: u32,
    pub end: u32,
}

impl RowWindow {
    pub fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }
}

impl From<[u32; 2]> for RowWindow {
    fn from(bounds: [u32; 2]) -> Self {
        Self::new(bounds[0], bounds[1])
    }
}

/// Parse a range string
///
/// Accepts `A2:A13`, `A2` (single cell, start = end), and either form behind
/// a quoted or unquoted sheet qualifier (`Sheet1!A2:A13`, `'My Sheet'!A2`).
/// `$` absolute markers are ignored. Reversed row bounds are normalized.
pub fn parse_range(range: &str) -> Result<RangeAddress, RangeParseError> {
    let range = range.trim();
    if range.is_empty() {
        return Err(RangeParseError::Empty);
    }

    let (sheet, reference) = split_sheet(range);
    let reference = reference.replace('$', "");

    let caps = CELL_RANGE
        .captures(&reference)
        .ok_or_else(|| RangeParseError::Malformed(range.to_string()))?;

    let start_row = parse_row(&caps[2], range)?;
    let end_row = match caps.get(4) {
        Some(m) => parse_row(m.as_str(), range)?,
        None => start_row,
    };
    let rows = RowWindow::new(start_row, end_row);

    Ok(RangeAddress {
        sheet,
        column: caps[1].to_ascii_uppercase(),
        start_row: rows.start,
        end_row: rows.end,
    })
}

/// Upper-cased start column of a range, `None` when it cannot be parsed
pub fn column_letter(range: &str) -> Option<String> {
    match parse_range(range) {
        Ok(address) => Some(address.column),
        Err(e) => {
            tracing::warn!(range = %range, error = %e, "Could not determine column of range");
            None
        }
    }
}

/// True for a non-empty run of ASCII letters
pub fn is_column_letters(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// Split off a sheet qualifier, unquoting `'It''s'` style names
pub(crate) fn split_sheet(range: &str) -> (Option<String>, &str) {
    match range.rsplit_once('!') {
        Some((sheet, reference)) => (Some(unquote_sheet(sheet)), reference),
        None => (None, range),
    }
}

fn unquote_sheet(sheet: &str) -> String {
    let sheet = sheet.trim();
    match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_string(),
    }
}

/// Prefix `reference` with a sheet qualifier, quoting the name when needed
pub(crate) fn qualify(sheet: Option<&str>, reference: &str) -> String {
    match sheet {
        None => reference.to_string(),
        Some(name) if is_bare_sheet_name(name) => format!("{}!{}", name, reference),
        Some(name) => format!("'{}'!{}", name.replace('\'', "''"), reference),
    }
}

/// Sheet names usable without quotes: identifiers that cannot be read as
/// an A1 cell (`AB12`, columns stop at `ZZZ`) or an R1C1 cell (`R1C1`)
fn is_bare_sheet_name(name: &str) -> bool {
    let mut chars = name.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !identifier {
        return false;
    }

    let a1_cell = CELL_RANGE
        .captures(name)
        .is_some_and(|caps| caps.get(3).is_none() && caps[1].len() <= 3);
    !(a1_cell || R1C1_CELL.is_match(name))
}

fn parse_row(digits: &str, range: &str) -> Result<u32, RangeParseError> {
    match digits.parse::<u32>() {
        Ok(row) if row >= 1 => Ok(row),
        _ => Err(RangeParseError::InvalidRow(range.to_string())),
    }
}
