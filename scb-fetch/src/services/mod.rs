//! Fetch pipeline services

pub mod chart_series;
pub mod coordinator;
pub mod orchestrator;

pub use chart_series::{ChartSeries, Trendline};
pub use coordinator::{FetchCoordinator, FetchOutcome};
pub use orchestrator::{BatchFetchOrchestrator, PipelineSettings, SheetRanges};
