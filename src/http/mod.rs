//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → middleware/cors.rs (origin admission, pre-flight)
//!     → handlers.rs (record_event) / health (/, /health)
//!     → request.rs (client ip, user agent)
//!     → ingest pipeline
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
