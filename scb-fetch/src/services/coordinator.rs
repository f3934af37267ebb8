//! Fetch-or-serve coordinator
//!
//! Decides per request whether to serve the cached entry or run a fresh
//! fetch. Only successful fetches reach the cache; a failed fetch leaves
//! any earlier entry untouched.

use tracing::{info, warn};

use crate::cache::{CacheEntry, CacheLookup, ResultCache};
use crate::error::FetchError;
use crate::services::orchestrator::{BatchFetchOrchestrator, SheetRanges};
use crate::store::StoreError;

/// Entry returned to the caller and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// `true` when served from the cache without contacting the provider
    pub cached: bool,
    pub entry: CacheEntry,
}

pub struct FetchCoordinator {
    orchestrator: BatchFetchOrchestrator,
    cache: ResultCache,
}

impl FetchCoordinator {
    pub fn new(orchestrator: BatchFetchOrchestrator, cache: ResultCache) -> Self {
        Self { orchestrator, cache }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Serve the cached entry for `block_id`, fetching only when absent
    pub async fn get_or_fetch(
        &self,
        block_id: &str,
        spreadsheet_id: &str,
        ranges: &SheetRanges,
    ) -> Result<FetchOutcome, FetchError> {
        let block_id = validate_block_id(block_id)?;

        match self.cache.lookup(block_id).await {
            Ok(CacheLookup::Hit(entry)) => {
                info!(block_id = %block_id, fetched_at = %entry.fetched_at, "Serving cached data");
                return Ok(FetchOutcome { cached: true, entry });
            }
            Ok(CacheLookup::Missing) | Ok(CacheLookup::Corrupt) => {}
            Err(e) => {
                warn!(block_id = %block_id, error = %e, "Cache read failed, fetching fresh data");
            }
        }

        self.fetch_and_store(block_id, spreadsheet_id, ranges).await
    }

    /// Always fetch, overwriting the cached entry on success
    pub async fn force_refresh(
        &self,
        block_id: &str,
        spreadsheet_id: &str,
        ranges: &SheetRanges,
    ) -> Result<FetchOutcome, FetchError> {
        let block_id = validate_block_id(block_id)?;
        info!(block_id = %block_id, "Forced refresh");
        self.fetch_and_store(block_id, spreadsheet_id, ranges).await
    }

    /// Cached entry only; never contacts the provider
    ///
    /// `Ok(None)` means the block was never fetched (or its entry is
    /// unreadable).
    pub async fn read_cached(&self, block_id: &str) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.cache.lookup(block_id.trim()).await?.into_entry())
    }

    async fn fetch_and_store(
        &self,
        block_id: &str,
        spreadsheet_id: &str,
        ranges: &SheetRanges,
    ) -> Result<FetchOutcome, FetchError> {
        let data = self
            .orchestrator
            .fetch_and_normalize(spreadsheet_id, ranges)
            .await?;
        let entry = CacheEntry::new(spreadsheet_id, data);

        if let Err(e) = self.cache.store(block_id, &entry).await {
            // Fresh data is still returned; the next request refetches
            warn!(block_id = %block_id, error = %e, "Failed to cache fetch result");
        }

        Ok(FetchOutcome { cached: false, entry })
    }
}

fn validate_block_id(block_id: &str) -> Result<&str, FetchError> {
    let trimmed = block_id.trim();
    if trimmed.is_empty() {
        Err(FetchError::InvalidRequest("blockId is blank".to_string()))
    } else {
        Ok(trimmed)
    }
}
