//! Event collector library.
//!
//! Receives analytics events from browsers, enriches them with
//! geolocation and user agent details, and appends them to Postgres.

pub mod config;
pub mod enrichment;
pub mod health;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod store;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
