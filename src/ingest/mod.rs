//! Event ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! POST /record_event body
//!     → event.rs (structural JSON bind)
//!     → attach client IP + raw user agent
//!     → [Deep] enrichment (geolocation, user agent)
//!     → serialize to one opaque JSON document
//!     → store (one append-only row)
//!     → 200 OK | 400 KO
//! ```

pub mod event;
pub mod pipeline;

pub use event::{Event, RequestContext};
pub use pipeline::{IngestError, Ingestor, Receipt, Stage};
