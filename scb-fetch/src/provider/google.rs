//! Google Sheets API client
//!
//! `spreadsheets.values.batchGet` with API-key or bearer-token auth and a
//! minimum spacing between requests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::{ProviderFetchError, SheetDataProvider};
use crate::range::{EchoedRange, Matrix};
use scb_common::config::GoogleConfig;

const USER_AGENT: &str = concat!("scb-fetch/", env!("CARGO_PKG_VERSION"));

/// batchGet response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

/// One echoed range; `values` is absent when every cell is blank
#[derive(Debug, Deserialize)]
struct ValueRange {
    range: String,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Credentials sent with each request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleAuth {
    ApiKey(String),
    AccessToken(String),
    None,
}

impl GoogleAuth {
    /// Access token wins over API key when both are configured
    pub fn from_config(config: &GoogleConfig) -> Self {
        let non_blank = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        match (non_blank(&config.access_token), non_blank(&config.api_key)) {
            (Some(token), _) => GoogleAuth::AccessToken(token),
            (None, Some(key)) => GoogleAuth::ApiKey(key),
            (None, None) => GoogleAuth::None,
        }
    }
}

/// Hands out batch-read slots at least `interval` apart
///
/// Each caller reserves the next free slot under the lock and then sleeps
/// until it without holding the lock, so concurrent block fetches queue in
/// arrival order. A zero interval disables spacing.
#[derive(Debug)]
struct RequestSpacing {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestSpacing {
    fn from_config(config: &GoogleConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.min_request_interval_ms),
            next_slot: Mutex::new(None),
        }
    }

    /// Reserve a slot; returns the instant the caller may send at
    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = self.next_slot.lock().unwrap_or_else(|e| e.into_inner());
        let slot = next.map_or(now, |n| n.max(now));
        *next = Some(slot + self.interval);
        slot
    }

    async fn until_clear(&self) {
        if self.interval.is_zero() {
            return;
        }
        let slot = self.reserve();
        if slot > Instant::now() {
            tracing::debug!(delay = ?(slot - Instant::now()), "Spacing Sheets request");
            tokio::time::sleep_until(slot).await;
        }
    }
}

/// Google Sheets API client
pub struct GoogleSheetsClient {
    http_client: reqwest::Client,
    spacing: RequestSpacing,
    base_url: String,
    auth: GoogleAuth,
}

impl GoogleSheetsClient {
    /// `timeout` bounds each HTTP request; the orchestrator applies its own
    /// timeout around the whole read as well
    pub fn new(config: &GoogleConfig, timeout: Duration) -> Result<Self, ProviderFetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderFetchError::Network(e.to_string()))?;

        let auth = GoogleAuth::from_config(config);
        if auth == GoogleAuth::None {
            tracing::warn!("No Google credentials configured; only public sheets will be readable");
        }

        Ok(Self {
            http_client,
            spacing: RequestSpacing::from_config(config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn batch_get_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values:batchGet",
            self.base_url, spreadsheet_id
        )
    }
}

#[async_trait]
impl SheetDataProvider for GoogleSheetsClient {
    fn name(&self) -> &'static str {
        "google-sheets"
    }

    async fn batch_read(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<EchoedRange>, ProviderFetchError> {
        self.spacing.until_clear().await;

        let mut query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        query.push(("majorDimension", "ROWS"));

        let mut request = self.http_client.get(self.batch_get_url(spreadsheet_id));
        request = match &self.auth {
            GoogleAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
            GoogleAuth::AccessToken(token) => request.bearer_auth(token),
            GoogleAuth::None => request,
        };

        tracing::debug!(
            spreadsheet_id = %spreadsheet_id,
            ranges = ranges.len(),
            "Querying Google Sheets batchGet"
        );

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderFetchError::Network(e.to_string()))?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(ProviderFetchError::Unauthorized);
        }

        if status == 429 {
            return Err(ProviderFetchError::QuotaExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderFetchError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: BatchGetResponse = response
            .json()
            .await
            .map_err(|e| ProviderFetchError::Parse(e.to_string()))?;

        let echoed: Vec<EchoedRange> = body
            .value_ranges
            .into_iter()
            .map(|vr| EchoedRange::new(vr.range, to_matrix(vr.values)))
            .collect();

        tracing::info!(
            spreadsheet_id = %spreadsheet_id,
            requested = ranges.len(),
            returned = echoed.len(),
            "Retrieved ranges from Google Sheets"
        );

        Ok(echoed)
    }
}

/// Stringify JSON cells the way the sheet displays them
fn to_matrix(rows: Vec<Vec<Value>>) -> Matrix {
    rows.into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
