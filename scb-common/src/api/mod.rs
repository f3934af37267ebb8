//! Shared HTTP API types
//!
//! # Design Principle
//!
//! This module contains ONLY plain serde types with no HTTP framework
//! dependencies. The fetch service wraps them with axum extractors and
//! responses.

pub mod types;

pub use types::{
    ErrorBody, ErrorDetail, FetchRequest, FetchResponse, NormalizedFetchResult, OverlayColumn,
};
