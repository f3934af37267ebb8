//! Sheet data providers
//!
//! The pipeline depends only on [`SheetDataProvider`]: one batched read of
//! a spreadsheet returning `(echoed range, matrix)` pairs in order.

pub mod google;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::range::EchoedRange;

pub use google::GoogleSheetsClient;

/// Batched read failure; the whole fetch fails with it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFetchError {
    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider rejected credentials")]
    Unauthorized,

    #[error("Provider quota exceeded")]
    QuotaExceeded,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of spreadsheet cell data
#[async_trait]
pub trait SheetDataProvider: Send + Sync {
    /// Provider identifier for logs
    fn name(&self) -> &'static str;

    /// Read every range of `ranges` from one spreadsheet in a single request
    async fn batch_read(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<EchoedRange>, ProviderFetchError>;
}
