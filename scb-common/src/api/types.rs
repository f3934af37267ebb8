//! Shared API request/response types
//!
//! The normalized fetch result is the contract between the fetch pipeline,
//! the result cache and the chart renderer. Its columns are row-aligned:
//! `labels`, `stats`, `badges` and every overlay's `values` have the same
//! length, and index `i` of each refers to the same sheet row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ========================================
// Normalized Fetch Result
// ========================================

/// One auxiliary column merged into chart tooltips
///
/// # Examples
///
/// ```
/// use scb_common::api::types::OverlayColumn;
///
/// let column = OverlayColumn {
///     range: "C2:C13".to_string(),
///     header: "Price".to_string(),
///     values: vec!["$10".to_string(), "$20".to_string()],
/// };
/// assert_eq!(column.values.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayColumn {
    /// Range string as requested by the editor
    pub range: String,
    /// Header cell text (row 1), or the bare column letter when blank
    pub header: String,
    /// Cell values, one per row of the row domain
    pub values: Vec<String>,
}

/// Row-aligned result of one batched sheet read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFetchResult {
    /// Category labels (one per bar/point)
    pub labels: Vec<String>,
    /// Raw stat cells; units are stripped at render time
    pub stats: Vec<String>,
    /// Per-row badge text, empty string = no badge
    pub badges: Vec<String>,
    /// Header text of the badge column, when a badge column is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_header: Option<String>,
    /// Overlay columns in request order
    pub overlays: Vec<OverlayColumn>,
}

impl NormalizedFetchResult {
    /// Number of rows in the row domain (the label count)
    pub fn row_count(&self) -> usize {
        self.labels.len()
    }

    /// True when every column has exactly `row_count()` entries
    pub fn is_aligned(&self) -> bool {
        let rows = self.row_count();
        self.stats.len() == rows
            && self.badges.len() == rows
            && self.overlays.iter().all(|o| o.values.len() == rows)
    }
}

// ========================================
// Fetch Request / Response
// ========================================

/// Body of `POST /api/fetch-data` and `POST /api/refresh`
///
/// The short field names sent by the block editor (`sheetId`, `label`,
/// `stats`, `overlay`) are accepted as aliases.
///
/// # Examples
///
/// ```
/// use scb_common::api::types::FetchRequest;
///
/// let json = r#"{
///     "sheetId": "1abc",
///     "blockId": "b-42",
///     "label": "A2:A13",
///     "stats": "O2:O13",
///     "overlay": "C2:C13"
/// }"#;
/// let request: FetchRequest = serde_json::from_str(json).unwrap();
/// assert_eq!(request.spreadsheet_id, "1abc");
/// assert_eq!(request.overlays(), vec!["C2:C13".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(alias = "sheetId")]
    pub spreadsheet_id: String,
    pub block_id: String,
    #[serde(alias = "label")]
    pub label_range: String,
    #[serde(alias = "stats")]
    pub stat_range: String,
    #[serde(default)]
    pub overlay_ranges: Vec<String>,
    /// Single-overlay form used by older editor builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    /// Overrides the configured badge column for this block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_column: Option<String>,
}

impl FetchRequest {
    /// Overlay ranges in request order, with the legacy single `overlay`
    /// appended when it is not already listed. Blank entries are dropped.
    pub fn overlays(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .overlay_ranges
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if let Some(single) = self.overlay.as_deref().map(str::trim) {
            if !single.is_empty() && !out.iter().any(|r| r == single) {
                out.push(single.to_string());
            }
        }
        out
    }
}

/// Successful fetch/refresh response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub success: bool,
    /// True when served from cache without contacting the sheet provider
    pub cached: bool,
    /// When the served data was read from the sheet
    pub fetched_at: DateTime<Utc>,
    pub data: NormalizedFetchResult,
}

impl FetchResponse {
    pub fn new(cached: bool, fetched_at: DateTime<Utc>, data: NormalizedFetchResult) -> Self {
        Self {
            success: true,
            cached,
            fetched_at,
            data,
        }
    }
}

// ========================================
// Error Response Types
// ========================================

/// Error envelope returned by every failing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error code and human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> NormalizedFetchResult {
        NormalizedFetchResult {
            labels: vec!["A".into(), "B".into(), "C".into()],
            stats: vec!["4.5".into(), "3.9".into(), "4.1".into()],
            badges: vec!["".into(), "Editor's Pick".into(), "".into()],
            badge_header: None,
            overlays: vec![OverlayColumn {
                range: "C2:C4".into(),
                header: "Price".into(),
                values: vec!["$10".into(), "$20".into(), "$30".into()],
            }],
        }
    }

    #[test]
    fn test_aligned_result() {
        let result = sample_result();
        assert_eq!(result.row_count(), 3);
        assert!(result.is_aligned());
    }

    #[test]
    fn test_misaligned_overlay_detected() {
        let mut result = sample_result();
        result.overlays[0].values.pop();
        assert!(!result.is_aligned());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut result = sample_result();
        result.badge_header = Some("Badge".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["badgeHeader"], "Badge");
        assert_eq!(json["overlays"][0]["header"], "Price");
        assert!(json.get("badge_header").is_none());
    }

    #[test]
    fn test_badge_header_omitted_when_absent() {
        let json = serde_json::to_string(&sample_result()).unwrap();
        assert!(!json.contains("badgeHeader"));
    }

    #[test]
    fn test_fetch_request_full_names() {
        let json = r#"{
            "spreadsheetId": "sheet",
            "blockId": "block",
            "labelRange": "A2:A13",
            "statRange": "O2:O13",
            "overlayRanges": ["C2:C13", " ", "D2:D13"],
            "badgeColumn": "B"
        }"#;
        let request: FetchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.label_range, "A2:A13");
        assert_eq!(request.badge_column.as_deref(), Some("B"));
        assert_eq!(request.overlays(), vec!["C2:C13".to_string(), "D2:D13".to_string()]);
    }

    #[test]
    fn test_fetch_request_legacy_overlay_not_duplicated() {
        let json = r#"{
            "sheetId": "sheet",
            "blockId": "block",
            "label": "A2:A13",
            "stats": "O2:O13",
            "overlayRanges": ["C2:C13"],
            "overlay": "C2:C13"
        }"#;
        let request: FetchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.overlays(), vec!["C2:C13".to_string()]);
    }

    #[test]
    fn test_fetch_request_requires_block_id() {
        let json = r#"{"sheetId": "s", "label": "A2:A3", "stats": "B2:B3"}"#;
        assert!(serde_json::from_str::<FetchRequest>(json).is_err());
    }

    #[test]
    fn test_error_body() {
        let body = ErrorBody::new("NO_CACHE", "No cached data yet");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["code"], "NO_CACHE");
        assert_eq!(json["error"]["message"], "No cached data yet");
    }
}
