//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! External call (geolocation lookup, event insert):
//!     → timeouts.rs (enforce deadline)
//!     → On expiry: caller degrades (empty enrichment) or rejects (insert)
//! ```
//!
//! # Design Decisions
//! - Every external call on the request path has a deadline
//! - No retries: failed inserts are reported to the caller, who may resubmit

pub mod timeouts;

pub use timeouts::{with_timeout, Elapsed};
