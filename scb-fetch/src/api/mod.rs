//! HTTP API handlers for scb-fetch

pub mod fetch;
pub mod health;

pub use fetch::fetch_routes;
pub use health::health_routes;
