//! scb-fetch library interface
//!
//! Batched sheet fetch, normalization and caching behind a small HTTP API.
//! Exposed as a library for integration testing.

pub mod align;
pub mod api;
pub mod cache;
pub mod error;
pub mod provider;
pub mod range;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult, FetchError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::FetchCoordinator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<FetchCoordinator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(coordinator: FetchCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::fetch_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // Block editors call in from the CMS origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
