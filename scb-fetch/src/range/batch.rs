//! Batch request builder
//!
//! Turns the editor's label, stat and overlay ranges into the single list of
//! range strings sent to the sheet provider. Derived ranges are added here:
//! one header cell (row 1) per overlay column, and, when a badge column is
//! configured, the badge header cell and a badge data range covering the
//! same rows as the first overlay (or the label range without overlays).

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use super::{is_column_letters, parse_range, qualify, split_sheet, RangeAddress, RowWindow};

/// Semantic role of one requested range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRole {
    Label,
    Stat,
    Badge,
    BadgeHeader,
    /// Overlay data column, by position in the request
    Overlay(usize),
    /// Header cell of the overlay at the same position
    OverlayHeader(usize),
}

impl RangeRole {
    /// Overlay data ranges may be matched by the widened-range fallback
    pub fn is_overlay(self) -> bool {
        matches!(self, RangeRole::Overlay(_))
    }
}

impl fmt::Display for RangeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeRole::Label => f.write_str("label"),
            RangeRole::Stat => f.write_str("stat"),
            RangeRole::Badge => f.write_str("badge"),
            RangeRole::BadgeHeader => f.write_str("badge header"),
            RangeRole::Overlay(i) => write!(f, "overlay {}", i),
            RangeRole::OverlayHeader(i) => write!(f, "overlay {} header", i),
        }
    }
}

/// A range string with its role and parsed address (when parseable)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTaggedRange {
    pub role: RangeRole,
    pub range: String,
    pub address: Option<RangeAddress>,
}

impl RoleTaggedRange {
    fn new(role: RangeRole, range: String) -> Self {
        let address = parse_range(&range).ok();
        Self { role, range, address }
    }
}

/// Builder misconfiguration; never a transient failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchBuildError {
    #[error("{0} range is blank")]
    BlankRange(RangeRole),

    #[error("invalid badge column: {0:?}")]
    InvalidBadgeColumn(String),
}

/// Every range of one fetch, tagged, plus the deduplicated request list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// All role-tagged ranges, derived ones included
    pub tagged: Vec<RoleTaggedRange>,
    /// Order-preserving, duplicate-free list sent to the provider
    pub ranges: Vec<String>,
}

impl BatchPlan {
    pub fn get(&self, role: RangeRole) -> Option<&RoleTaggedRange> {
        self.tagged.iter().find(|t| t.role == role)
    }

    pub fn overlay_count(&self) -> usize {
        self.tagged.iter().filter(|t| t.role.is_overlay()).count()
    }

    pub fn has_badges(&self) -> bool {
        self.get(RangeRole::Badge).is_some()
    }
}

/// Builds [`BatchPlan`]s for one pipeline configuration
#[derive(Debug, Clone)]
pub struct BatchRequestBuilder {
    badge_column: Option<String>,
    default_rows: RowWindow,
}

impl BatchRequestBuilder {
    pub fn new(default_rows: RowWindow) -> Self {
        Self {
            badge_column: None,
            default_rows,
        }
    }

    /// Set (or clear) the badge column; letters only, stored upper-cased
    pub fn with_badge_column(mut self, column: Option<&str>) -> Result<Self, BatchBuildError> {
        self.badge_column = match column.map(str::trim) {
            None | Some("") => None,
            Some(letters) if is_column_letters(letters) => Some(letters.to_ascii_uppercase()),
            Some(other) => return Err(BatchBuildError::InvalidBadgeColumn(other.to_string())),
        };
        Ok(self)
    }

    pub fn badge_column(&self) -> Option<&str> {
        self.badge_column.as_deref()
    }

    /// Build the plan for one fetch
    ///
    /// Blank label, stat or overlay ranges are rejected. Every tagged range
    /// appears once in [`BatchPlan::ranges`], in first-seen order.
    pub fn build(
        &self,
        label_range: &str,
        stat_range: &str,
        overlay_ranges: &[String],
    ) -> Result<BatchPlan, BatchBuildError> {
        let label = non_blank(label_range, RangeRole::Label)?;
        let stat = non_blank(stat_range, RangeRole::Stat)?;
        let overlays = overlay_ranges
            .iter()
            .enumerate()
            .map(|(i, r)| non_blank(r, RangeRole::Overlay(i)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut data = vec![
            RoleTaggedRange::new(RangeRole::Label, label.clone()),
            RoleTaggedRange::new(RangeRole::Stat, stat),
        ];
        let mut headers = Vec::new();

        if let Some(column) = &self.badge_column {
            let anchor = overlays.first().unwrap_or(&label);
            let (sheet, _) = split_sheet(anchor);
            let rows = self.rows_of(anchor);
            let badge = format!("{}{}:{}{}", column, rows.start, column, rows.end);
            data.push(RoleTaggedRange::new(
                RangeRole::Badge,
                qualify(sheet.as_deref(), &badge),
            ));
            headers.push(RoleTaggedRange::new(
                RangeRole::BadgeHeader,
                qualify(sheet.as_deref(), &format!("{}1", column)),
            ));
        }

        let mut overlay_headers = Vec::new();
        for (i, range) in overlays.into_iter().enumerate() {
            let tagged = RoleTaggedRange::new(RangeRole::Overlay(i), range);
            match &tagged.address {
                Some(address) => overlay_headers.push(RoleTaggedRange::new(
                    RangeRole::OverlayHeader(i),
                    qualify(address.sheet.as_deref(), &format!("{}1", address.column)),
                )),
                None => warn!(range = %tagged.range, "Overlay range not parseable, header cell skipped"),
            }
            data.push(tagged);
        }

        overlay_headers.extend(headers);
        data.extend(overlay_headers);
        let tagged = data;

        let mut seen = HashSet::new();
        let ranges: Vec<String> = tagged
            .iter()
            .filter(|t| seen.insert(t.range.as_str()))
            .map(|t| t.range.clone())
            .collect();

        debug!(
            requested = tagged.len(),
            distinct = ranges.len(),
            "Built batch request"
        );

        Ok(BatchPlan { tagged, ranges })
    }

    /// Row window of `range`, or the default window when it cannot be parsed
    fn rows_of(&self, range: &str) -> RowWindow {
        match parse_range(range) {
            Ok(address) => address.rows(),
            Err(e) => {
                warn!(
                    range = %range,
                    error = %e,
                    start = self.default_rows.start,
                    end = self.default_rows.end,
                    "Range not parseable, using default row window"
                );
                self.default_rows
            }
        }
    }
}

fn non_blank(range: &str, role: RangeRole) -> Result<String, BatchBuildError> {
    let range = range.trim();
    if range.is_empty() {
        Err(BatchBuildError::BlankRange(role))
    } else {
        Ok(range.to_string())
    }
}
