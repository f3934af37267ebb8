//! Batch fetch orchestrator
//!
//! One fetch = build the batch request, perform exactly one provider read,
//! reconcile the echoed ranges, and align every column to the row domain.
//! A provider failure fails the whole fetch; reconciliation misses and
//! unparseable ranges only degrade the affected column.

use std::sync::Arc;
use std::time::Duration;

use scb_common::api::FetchRequest;
use scb_common::config::{PipelineConfig, RowDomainSource};
use scb_common::{NormalizedFetchResult, OverlayColumn};
use tracing::{debug, info};

use crate::align::{
    conform_to_row_count, flatten_column, flatten_column_preserve_length, row_domain_count,
};
use crate::error::FetchError;
use crate::provider::{ProviderFetchError, SheetDataProvider};
use crate::range::batch::{BatchBuildError, BatchPlan, BatchRequestBuilder, RangeRole};
use crate::range::reconcile::{ReconciledRanges, Reconciler};
use crate::range::{column_letter, RowWindow};

/// Pipeline settings resolved once from configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub badge_column: Option<String>,
    pub row_domain_source: RowDomainSource,
    pub default_rows: RowWindow,
    pub provider_timeout: Duration,
}

impl PipelineSettings {
    /// Validate configuration; an invalid badge column is rejected here
    /// rather than on the first fetch
    pub fn from_config(config: &PipelineConfig) -> Result<Self, BatchBuildError> {
        let default_rows = RowWindow::from(config.default_row_window);
        let badge_column = BatchRequestBuilder::new(default_rows)
            .with_badge_column(config.badge_column.as_deref())?
            .badge_column()
            .map(str::to_string);

        Ok(Self {
            badge_column,
            row_domain_source: config.row_domain_source,
            default_rows,
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
        })
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            badge_column: None,
            row_domain_source: RowDomainSource::Labels,
            default_rows: RowWindow::new(2, 13),
            provider_timeout: Duration::from_secs(30),
        }
    }
}

/// Role-tagged ranges of one chart block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRanges {
    pub label: String,
    pub stat: String,
    pub overlays: Vec<String>,
    /// Per-block badge column; falls back to the configured one
    pub badge_column: Option<String>,
}

impl SheetRanges {
    pub fn new(label: impl Into<String>, stat: impl Into<String>, overlays: Vec<String>) -> Self {
        Self {
            label: label.into(),
            stat: stat.into(),
            overlays,
            badge_column: None,
        }
    }

    pub fn with_badge_column(mut self, column: impl Into<String>) -> Self {
        self.badge_column = Some(column.into());
        self
    }
}

impl From<&FetchRequest> for SheetRanges {
    fn from(request: &FetchRequest) -> Self {
        Self {
            label: request.label_range.clone(),
            stat: request.stat_range.clone(),
            overlays: request.overlays(),
            badge_column: request
                .badge_column
                .clone()
                .filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Composes builder, provider, reconciler and aligner
pub struct BatchFetchOrchestrator {
    provider: Arc<dyn SheetDataProvider>,
    settings: PipelineSettings,
}

impl BatchFetchOrchestrator {
    pub fn new(provider: Arc<dyn SheetDataProvider>, settings: PipelineSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Fetch and normalize one block's data
    pub async fn fetch_and_normalize(
        &self,
        spreadsheet_id: &str,
        ranges: &SheetRanges,
    ) -> Result<NormalizedFetchResult, FetchError> {
        validate_spreadsheet_id(spreadsheet_id)?;

        let badge_column = ranges
            .badge_column
            .as_deref()
            .or(self.settings.badge_column.as_deref());
        let plan = BatchRequestBuilder::new(self.settings.default_rows)
            .with_badge_column(badge_column)?
            .build(&ranges.label, &ranges.stat, &ranges.overlays)?;

        let timeout = self.settings.provider_timeout;
        let echoed = tokio::time::timeout(
            timeout,
            self.provider.batch_read(spreadsheet_id, &plan.ranges),
        )
        .await
        .map_err(|_| ProviderFetchError::Timeout(timeout))??;

        debug!(
            spreadsheet_id = %spreadsheet_id,
            provider = self.provider.name(),
            echoed = echoed.len(),
            "Batch read complete"
        );

        let reconciled = Reconciler::new(echoed).reconcile(&plan.tagged);
        let result = normalize(&plan, &reconciled, self.settings.row_domain_source);

        info!(
            spreadsheet_id = %spreadsheet_id,
            rows = result.row_count(),
            overlays = result.overlays.len(),
            misses = reconciled.misses().len(),
            "Normalized sheet data"
        );

        Ok(result)
    }
}

/// Assemble the row-aligned result from reconciled matrices
pub fn normalize(
    plan: &BatchPlan,
    reconciled: &ReconciledRanges,
    row_domain_source: RowDomainSource,
) -> NormalizedFetchResult {
    let labels = flatten_column(reconciled.get(RangeRole::Label));

    let overlay_values: Vec<Vec<String>> = (0..plan.overlay_count())
        .map(|i| flatten_column(reconciled.get(RangeRole::Overlay(i))))
        .collect();

    // A first overlay that was missed or never parsed cannot anchor the rows
    let first_overlay_usable = plan
        .get(RangeRole::Overlay(0))
        .is_some_and(|t| t.address.is_some())
        && !reconciled.misses().contains(&RangeRole::Overlay(0));
    let row_count = row_domain_count(
        row_domain_source,
        &labels,
        overlay_values
            .first()
            .filter(|_| first_overlay_usable)
            .map(Vec::as_slice),
    );

    let badges = if plan.has_badges() {
        flatten_column_preserve_length(reconciled.get(RangeRole::Badge), row_count)
    } else {
        vec![String::new(); row_count]
    };

    let badge_header = plan
        .get(RangeRole::BadgeHeader)
        .map(|tagged| header_text(reconciled, RangeRole::BadgeHeader, &fallback_header(&tagged.range)));

    let overlays = overlay_values
        .into_iter()
        .enumerate()
        .map(|(i, values)| {
            let tagged = plan.get(RangeRole::Overlay(i));
            OverlayColumn {
                range: tagged.map(|t| t.range.clone()).unwrap_or_default(),
                header: header_text(
                    reconciled,
                    RangeRole::OverlayHeader(i),
                    &tagged.map(|t| fallback_header(&t.range)).unwrap_or_default(),
                ),
                values: conform_to_row_count(values, row_count),
            }
        })
        .collect();

    NormalizedFetchResult {
        labels: conform_to_row_count(labels, row_count),
        stats: conform_to_row_count(flatten_column(reconciled.get(RangeRole::Stat)), row_count),
        badges,
        badge_header,
        overlays,
    }
}

/// Bare column letter of `range`, or empty when unparseable
fn fallback_header(range: &str) -> String {
    column_letter(range).unwrap_or_default()
}

/// Header cell text, or `fallback` (the column letter) when blank
fn header_text(reconciled: &ReconciledRanges, role: RangeRole, fallback: &str) -> String {
    reconciled
        .get(role)
        .first()
        .and_then(|row| row.first())
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Spreadsheet ids are URL path segments: letters, digits, `-` and `_`
fn validate_spreadsheet_id(id: &str) -> Result<(), FetchError> {
    if !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(FetchError::InvalidRequest(format!(
            "invalid spreadsheet id: {:?}",
            id
        )))
    }
}
