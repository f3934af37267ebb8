//! End-to-end pipeline tests: batch build → provider → reconcile → align → cache
//!
//! The scripted provider echoes ranges the way the Sheets API does: sheet
//! name prepended and quoted, trailing blank cells trimmed, and overlay
//! ranges optionally widened.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scb_common::config::RowDomainSource;
use scb_fetch::cache::ResultCache;
use scb_fetch::provider::{ProviderFetchError, SheetDataProvider};
use scb_fetch::range::{parse_range, EchoedRange, Matrix};
use scb_fetch::services::{BatchFetchOrchestrator, FetchCoordinator, PipelineSettings, SheetRanges};
use scb_fetch::store::{FileBlobStore, MemoryBlobStore};
use scb_fetch::FetchError;

/// Answers batch reads from a fixed cell table
#[derive(Default)]
struct ScriptedProvider {
    /// Column letter → values from row 1 down
    columns: HashMap<String, Vec<&'static str>>,
    /// Requested range → echoed range, for widened responses
    widen: HashMap<String, String>,
    /// Requested ranges left out of the response entirely
    omit: Vec<String>,
    /// Ranges of every call
    calls: Mutex<Vec<Vec<String>>>,
    stall: bool,
}

impl ScriptedProvider {
    fn with_column(mut self, column: &str, cells: &[&'static str]) -> Self {
        self.columns.insert(column.to_string(), cells.to_vec());
        self
    }

    fn widening(mut self, requested: &str, echoed: &str) -> Self {
        self.widen.insert(requested.to_string(), echoed.to_string());
        self
    }

    fn omitting(mut self, requested: &str) -> Self {
        self.omit.push(requested.to_string());
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_call(&self) -> Vec<String> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn cells(&self, range: &str) -> Matrix {
        let Ok(address) = parse_range(range) else {
            return Vec::new();
        };
        let column = self.columns.get(&address.column).cloned().unwrap_or_default();
        let mut rows: Matrix = (address.start_row..=address.end_row)
            .map(|row| {
                column
                    .get(row as usize - 1)
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| vec![cell.to_string()])
                    .unwrap_or_default()
            })
            .collect();
        // The API drops trailing empty rows
        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        rows
    }
}

#[async_trait]
impl SheetDataProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn batch_read(
        &self,
        _spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<EchoedRange>, ProviderFetchError> {
        self.calls.lock().unwrap().push(ranges.to_vec());
        if self.stall {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        Ok(ranges
            .iter()
            .filter(|range| !self.omit.contains(range))
            .map(|range| {
                let echoed = self.widen.get(range).unwrap_or(range);
                EchoedRange::new(format!("'Sheet1'!{}", echoed), self.cells(range))
            })
            .collect())
    }
}

fn products() -> ScriptedProvider {
    ScriptedProvider::default()
        .with_column("A", &["Product", "A", "B", "C"])
        .with_column("B", &["Badge", "", "Editor's Pick", ""])
        .with_column("C", &["Price", "$10", "$20", "$30"])
        .with_column("O", &["Rating", "4.5", "3.9", "4.1"])
}

fn coordinator(provider: Arc<ScriptedProvider>, settings: PipelineSettings) -> FetchCoordinator {
    FetchCoordinator::new(
        BatchFetchOrchestrator::new(provider, settings),
        ResultCache::new(Arc::new(MemoryBlobStore::new())),
    )
}

fn badge_settings() -> PipelineSettings {
    PipelineSettings {
        badge_column: Some("B".to_string()),
        ..PipelineSettings::default()
    }
}

#[tokio::test]
async fn test_badges_and_overlay_align_to_labels() {
    let provider = Arc::new(products());
    let coord = coordinator(provider.clone(), badge_settings());

    let ranges = SheetRanges::new("A2:A4", "O2:O4", vec!["C2:C4".to_string()]);
    let outcome = coord.get_or_fetch("block-1", "sheet-1", &ranges).await.unwrap();
    let data = outcome.entry.data;

    assert_eq!(data.labels, vec!["A", "B", "C"]);
    assert_eq!(data.stats, vec!["4.5", "3.9", "4.1"]);
    assert_eq!(data.badges, vec!["", "Editor's Pick", ""]);
    assert_eq!(data.badge_header.as_deref(), Some("Badge"));
    assert_eq!(data.overlays.len(), 1);
    assert_eq!(data.overlays[0].header, "Price");
    assert_eq!(data.overlays[0].values, vec!["$10", "$20", "$30"]);
    assert!(data.is_aligned());

    assert_eq!(
        provider.last_call(),
        vec!["A2:A4", "O2:O4", "B2:B4", "C2:C4", "C1", "B1"]
    );
}

#[tokio::test]
async fn test_widened_overlay_echo_resolves() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .with_column("A", &["", "Widget", "Gadget"])
            .with_column("O", &["", "4.5", "3.0"])
            .with_column("C", &["Price", "$10", "$12"])
            .widening("C2:C13", "C2:AG13"),
    );
    let coord = coordinator(provider.clone(), PipelineSettings::default());

    let ranges = SheetRanges::new("A2:A13", "O2:O13", vec!["C2:C13".to_string()]);
    let data = coord
        .get_or_fetch("block", "sheet", &ranges)
        .await
        .unwrap()
        .entry
        .data;

    assert_eq!(data.labels, vec!["Widget", "Gadget"]);
    assert_eq!(data.stats, vec!["4.5", "3.0"]);
    assert_eq!(data.overlays[0].values, vec!["$10", "$12"]);
    assert_eq!(data.overlays[0].header, "Price");
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let provider = Arc::new(products());
    let coord = coordinator(provider.clone(), badge_settings());
    let ranges = SheetRanges::new("A2:A4", "O2:O4", vec!["C2:C4".to_string()]);

    let first = coord.get_or_fetch("block", "sheet", &ranges).await.unwrap();
    let second = coord.get_or_fetch("block", "sheet", &ranges).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.entry.data, second.entry.data);
    assert_eq!(first.entry.fetched_at, second.entry.fetched_at);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_refresh_always_calls_provider() {
    let provider = Arc::new(products());
    let coord = coordinator(provider.clone(), PipelineSettings::default());
    let ranges = SheetRanges::new("A2:A4", "O2:O4", vec![]);

    coord.get_or_fetch("block", "sheet", &ranges).await.unwrap();
    let refreshed = coord.force_refresh("block", "sheet", &ranges).await.unwrap();
    let served = coord.get_or_fetch("block", "sheet", &ranges).await.unwrap();

    assert!(!refreshed.cached);
    assert!(served.cached);
    assert_eq!(served.entry.fetched_at, refreshed.entry.fetched_at);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_leaves_cache_untouched() {
    let settings = PipelineSettings {
        provider_timeout: Duration::from_secs(5),
        ..PipelineSettings::default()
    };
    let ranges = SheetRanges::new("A2:A4", "O2:O4", vec![]);
    let store = Arc::new(MemoryBlobStore::new());

    // Seed the cache with a successful fetch
    let healthy = FetchCoordinator::new(
        BatchFetchOrchestrator::new(Arc::new(products()), settings.clone()),
        ResultCache::new(store.clone()),
    );
    let previous = healthy.get_or_fetch("block", "sheet", &ranges).await.unwrap();

    let stalled = FetchCoordinator::new(
        BatchFetchOrchestrator::new(
            Arc::new(ScriptedProvider {
                stall: true,
                ..products()
            }),
            settings,
        ),
        ResultCache::new(store),
    );

    let err = stalled.force_refresh("block", "sheet", &ranges).await.unwrap_err();
    assert!(matches!(err, FetchError::Provider(ProviderFetchError::Timeout(_))));
    assert_eq!(stalled.read_cached("block").await.unwrap(), Some(previous.entry));

    let err = stalled.get_or_fetch("other", "sheet", &ranges).await.unwrap_err();
    assert!(matches!(err, FetchError::Provider(ProviderFetchError::Timeout(_))));
    assert_eq!(stalled.read_cached("other").await.unwrap(), None);
}

#[tokio::test]
async fn test_first_overlay_row_domain_pads_labels() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .with_column("A", &["", "A", "B"])
            .with_column("C", &["Price", "$1", "$2", "$3", "$4"])
            .with_column("E", &["Flag", "", "", "", "Sale"]),
    );
    let settings = PipelineSettings {
        badge_column: Some("E".to_string()),
        row_domain_source: RowDomainSource::FirstOverlay,
        ..PipelineSettings::default()
    };
    let coord = coordinator(provider, settings);

    let ranges = SheetRanges::new("A2:A5", "O2:O5", vec!["C2:C5".to_string()]);
    let data = coord
        .get_or_fetch("block", "sheet", &ranges)
        .await
        .unwrap()
        .entry
        .data;

    assert_eq!(data.row_count(), 4);
    assert_eq!(data.labels, vec!["A", "B", "", ""]);
    assert_eq!(data.stats, vec!["", "", "", ""]);
    assert_eq!(data.badges, vec!["", "", "", "Sale"]);
    assert!(data.is_aligned());
}

#[tokio::test]
async fn test_file_cache_survives_new_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let ranges = SheetRanges::new("A2:A4", "O2:O4", vec![]);

    let provider = Arc::new(products());
    let first = FetchCoordinator::new(
        BatchFetchOrchestrator::new(provider.clone(), PipelineSettings::default()),
        ResultCache::new(Arc::new(FileBlobStore::open(dir.path()).await.unwrap())),
    );
    let fetched = first.get_or_fetch("block/../1", "sheet", &ranges).await.unwrap();

    let second = FetchCoordinator::new(
        BatchFetchOrchestrator::new(provider.clone(), PipelineSettings::default()),
        ResultCache::new(Arc::new(FileBlobStore::open(dir.path()).await.unwrap())),
    );
    let served = second.get_or_fetch("block/../1", "sheet", &ranges).await.unwrap();

    assert!(served.cached);
    assert_eq!(served.entry, fetched.entry);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_unmatched_overlay_blanks_only_that_column() {
    for source in [RowDomainSource::Labels, RowDomainSource::FirstOverlay] {
        let provider = Arc::new(products().omitting("C2:C4"));
        let settings = PipelineSettings {
            badge_column: Some("B".to_string()),
            row_domain_source: source,
            ..PipelineSettings::default()
        };
        let coord = coordinator(provider, settings);

        let ranges = SheetRanges::new("A2:A4", "O2:O4", vec!["C2:C4".to_string()]);
        let data = coord
            .get_or_fetch("block", "sheet", &ranges)
            .await
            .unwrap()
            .entry
            .data;

        assert_eq!(data.labels, vec!["A", "B", "C"], "{:?}", source);
        assert_eq!(data.stats, vec!["4.5", "3.9", "4.1"], "{:?}", source);
        assert_eq!(data.badges, vec!["", "Editor's Pick", ""], "{:?}", source);
        assert_eq!(data.overlays[0].values, vec!["", "", ""], "{:?}", source);
        assert_eq!(data.overlays[0].header, "Price", "{:?}", source);
        assert!(data.is_aligned());
    }
}

#[tokio::test]
async fn test_unmatched_stat_column_is_blank() {
    let provider = Arc::new(products().omitting("O2:O4"));
    let coord = coordinator(provider, PipelineSettings::default());

    let ranges = SheetRanges::new("A2:A4", "O2:O4", vec!["C2:C4".to_string()]);
    let data = coord
        .get_or_fetch("block", "sheet", &ranges)
        .await
        .unwrap()
        .entry
        .data;

    assert_eq!(data.labels, vec!["A", "B", "C"]);
    assert_eq!(data.stats, vec!["", "", ""]);
    assert_eq!(data.overlays[0].values, vec!["$10", "$20", "$30"]);
}
