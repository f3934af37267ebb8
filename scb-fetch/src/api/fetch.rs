//! Fetch, refresh and cached-read endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use scb_common::api::{FetchRequest, FetchResponse};

use crate::error::{ApiError, ApiResult};
use crate::services::{ChartSeries, FetchOutcome, SheetRanges};
use crate::AppState;

/// Query string of the read-only endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockQuery {
    pub block_id: String,
}

fn into_response(outcome: FetchOutcome) -> Json<FetchResponse> {
    Json(FetchResponse::new(
        outcome.cached,
        outcome.entry.fetched_at,
        outcome.entry.data,
    ))
}

/// POST /api/fetch-data
///
/// Serves the block's cached data, fetching from the sheet only when
/// nothing is cached yet.
pub async fn fetch_data(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> ApiResult<Json<FetchResponse>> {
    let outcome = state
        .coordinator
        .get_or_fetch(
            &request.block_id,
            &request.spreadsheet_id,
            &SheetRanges::from(&request),
        )
        .await?;
    Ok(into_response(outcome))
}

/// POST /api/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> ApiResult<Json<FetchResponse>> {
    let outcome = state
        .coordinator
        .force_refresh(
            &request.block_id,
            &request.spreadsheet_id,
            &SheetRanges::from(&request),
        )
        .await?;
    Ok(into_response(outcome))
}

/// GET /api/cached?blockId=
pub async fn cached(
    State(state): State<AppState>,
    Query(query): Query<BlockQuery>,
) -> ApiResult<Json<FetchResponse>> {
    let entry = state
        .coordinator
        .read_cached(&query.block_id)
        .await?
        .ok_or_else(|| ApiError::NoCache(query.block_id.clone()))?;

    Ok(Json(FetchResponse::new(true, entry.fetched_at, entry.data)))
}

/// GET /api/chart-data?blockId=
pub async fn chart_data(
    State(state): State<AppState>,
    Query(query): Query<BlockQuery>,
) -> ApiResult<Json<ChartSeries>> {
    let entry = state
        .coordinator
        .read_cached(&query.block_id)
        .await?
        .ok_or_else(|| ApiError::NoCache(query.block_id.clone()))?;

    Ok(Json(ChartSeries::from_result(&entry.data)))
}

/// Build fetch routes
pub fn fetch_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fetch-data", post(fetch_data))
        .route("/api/refresh", post(refresh))
        .route("/api/cached", get(cached))
        .route("/api/chart-data", get(chart_data))
}
