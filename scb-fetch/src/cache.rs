//! Result cache
//!
//! Last successful normalized fetch per block id, serialized as JSON into a
//! [`BlobStore`]. There is no TTL: an entry is either present or absent.
//! Entries are created on the first successful fetch, overwritten by a
//! refresh, and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use scb_common::NormalizedFetchResult;

use crate::store::{BlobStore, StoreError};

/// Persisted cache value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub spreadsheet_id: String,
    pub fetched_at: DateTime<Utc>,
    pub data: NormalizedFetchResult,
}

impl CacheEntry {
    pub fn new(spreadsheet_id: impl Into<String>, data: NormalizedFetchResult) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            fetched_at: Utc::now(),
            data,
        }
    }
}

/// Cache lookup outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(CacheEntry),
    /// Nothing stored under the key
    Missing,
    /// Stored bytes did not deserialize; callers treat this as missing
    Corrupt,
}

impl CacheLookup {
    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            CacheLookup::Hit(entry) => Some(entry),
            CacheLookup::Missing | CacheLookup::Corrupt => None,
        }
    }
}

/// Typed view over a blob store, keyed by block id
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn BlobStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    /// Read the entry for `block_id`
    pub async fn lookup(&self, block_id: &str) -> Result<CacheLookup, StoreError> {
        let Some(bytes) = self.store.get(block_id).await? else {
            tracing::debug!(block_id = %block_id, "Cache miss");
            return Ok(CacheLookup::Missing);
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => {
                tracing::debug!(block_id = %block_id, fetched_at = %entry.fetched_at, "Cache hit");
                Ok(CacheLookup::Hit(entry))
            }
            Err(e) => {
                tracing::warn!(
                    block_id = %block_id,
                    bytes = bytes.len(),
                    error = %e,
                    "Cached entry is corrupt, treating as absent"
                );
                Ok(CacheLookup::Corrupt)
            }
        }
    }

    /// Overwrite the entry for `block_id`
    pub async fn store(&self, block_id: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entry)?;
        self.store.put(block_id, &bytes).await?;
        tracing::info!(
            block_id = %block_id,
            rows = entry.data.row_count(),
            backend = self.store.name(),
            "Cached fetch result"
        );
        Ok(())
    }
}
