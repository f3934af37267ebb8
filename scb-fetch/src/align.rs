//! Column alignment
//!
//! Flattens provider matrices (row-major, ragged) into single columns.
//! The provider trims trailing blank cells and rows, so a column's natural
//! length can be shorter than the row domain; the helpers here decide
//! whether that shortening is authoritative or must be padded back.

use scb_common::config::RowDomainSource;

/// First cell of every row that has one; rows without a cell are skipped
pub fn flatten_column(matrix: &[Vec<String>]) -> Vec<String> {
    matrix.iter().filter_map(|row| row.first().cloned()).collect()
}

/// Exactly `expected_count` values, index-aligned with the matrix rows
///
/// Missing rows and empty cells become empty strings; values never shift
/// to an earlier index. Rows past `expected_count` are ignored.
pub fn flatten_column_preserve_length(matrix: &[Vec<String>], expected_count: usize) -> Vec<String> {
    (0..expected_count)
        .map(|i| {
            matrix
                .get(i)
                .and_then(|row| row.first())
                .filter(|cell| !cell.is_empty())
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

/// Pad with empty strings or truncate so `values.len() == row_count`
pub fn conform_to_row_count(mut values: Vec<String>, row_count: usize) -> Vec<String> {
    values.resize(row_count, String::new());
    values
}

/// Row count of the row domain for one fetch
///
/// `FirstOverlay` falls back to the label count when there is no overlay.
pub fn row_domain_count(
    source: RowDomainSource,
    labels: &[String],
    first_overlay: Option<&[String]>,
) -> usize {
    match (source, first_overlay) {
        (RowDomainSource::FirstOverlay, Some(values)) => values.len(),
        _ => labels.len(),
    }
}
