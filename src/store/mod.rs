//! Event store subsystem.
//!
//! # Data Flow
//! ```text
//! Serialized event (opaque JSON document)
//!     → EventStore::insert
//!     → one append-only row: (created_at = server clock, details = payload)
//! ```
//!
//! # Design Decisions
//! - Payload is opaque; new event fields never need a migration
//! - Every event is an independent insert: no upsert, no batching, no retry
//! - Implementations must be safe to share across concurrent handlers

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use postgres::PgEventStore;

/// Errors from the event store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Append-only storage for serialized events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one row holding `payload`, returning its server-assigned
    /// creation timestamp.
    async fn insert(&self, payload: &str) -> Result<DateTime<Utc>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;
}
