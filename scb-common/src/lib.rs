//! # SCB Common Library
//!
//! Shared code for the Sheets Chart Block services:
//! - Error type
//! - TOML bootstrap configuration and config-file discovery
//! - API request/response types (normalized fetch result, fetch envelopes)

pub mod api;
pub mod config;
pub mod error;

pub use api::types::{NormalizedFetchResult, OverlayColumn};
pub use error::{Error, Result};
