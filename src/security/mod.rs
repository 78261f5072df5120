//! Cross-origin admission subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     CorsConfig
//!     → pattern.rs (compile anchored patterns, skip empty/malformed)
//!     → policy.rs (tier + exact list + patterns + response headers)
//!     → Arc<OriginPolicy> (immutable)
//!
//! Every request:
//!     Origin header
//!     → admission.rs (exact match → pattern match → deny)
//!     → access-control headers (admitted only)
//! ```
//!
//! # Design Decisions
//! - Strictness: production > staging > development
//! - Never emit a wildcard allow-origin; always echo the caller
//! - Denial emits nothing; the browser enforces the block

pub mod admission;
pub mod pattern;
pub mod policy;

pub use admission::{Admission, AdmissionEngine};
pub use pattern::{OriginPattern, PatternError, PatternKind};
pub use policy::{CorsResponseConfig, OriginPolicy};
