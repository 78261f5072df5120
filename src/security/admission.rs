//! Origin admission engine.
//!
//! # Responsibilities
//! - Decide whether a request's `Origin` is admitted under the policy
//! - Produce the access-control response headers for admitted origins
//!
//! # Design Decisions
//! - Pure: no I/O, no state beyond the immutable policy
//! - Exact matches are checked before patterns; first match wins
//! - The allow-origin value is always the caller's literal origin

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, Method};

use crate::config::Environment;
use crate::security::policy::OriginPolicy;

/// Outcome of evaluating a request's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No `Origin` header: not a cross-origin request.
    NotCors,
    /// Origin admitted; carries the value to echo back.
    Allowed(HeaderValue),
    /// Origin not admitted; no headers are emitted.
    Denied,
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Admission::NotCors => "not_cors",
            Admission::Allowed(_) => "allowed",
            Admission::Denied => "denied",
        }
    }
}

/// Evaluates origins against an [`OriginPolicy`].
#[derive(Debug, Clone)]
pub struct AdmissionEngine {
    policy: Arc<OriginPolicy>,
}

impl AdmissionEngine {
    pub fn new(policy: Arc<OriginPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Decide admission for the raw `Origin` header value.
    pub fn admit(&self, origin: Option<&HeaderValue>) -> Admission {
        let Some(value) = origin else {
            return Admission::NotCors;
        };

        let allowed = match self.policy.environment() {
            Environment::Production => value
                .to_str()
                .map(|origin| self.is_listed(origin))
                .unwrap_or(false),
            Environment::Staging | Environment::Development => true,
        };

        if allowed {
            Admission::Allowed(value.clone())
        } else {
            Admission::Denied
        }
    }

    /// Production matching: exact list, then patterns.
    fn is_listed(&self, origin: &str) -> bool {
        let origin = origin.trim();

        if self.policy.exact_origins().iter().any(|o| o == origin) {
            tracing::trace!(origin, "Exact origin match");
            return true;
        }

        match self.policy.patterns().iter().find(|p| p.matches(origin)) {
            Some(pattern) => {
                tracing::trace!(origin, pattern = pattern.source(), "Origin pattern match");
                true
            }
            None => false,
        }
    }

    /// Access-control headers for an admission decision.
    ///
    /// Empty unless the origin was admitted. Pre-flight responses carry the
    /// method, header and max-age grants; actual responses carry the exposed
    /// headers.
    pub fn response_headers(&self, admission: &Admission, preflight: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Admission::Allowed(origin) = admission else {
            return headers;
        };
        let response = self.policy.response();

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        if response.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }

        if preflight {
            if let Some(methods) = join(response.allow_methods.iter().map(Method::as_str)) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
            }
            if let Some(names) = join(response.allow_headers.iter().map(|h| h.as_str())) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, names);
            }
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from(response.max_age.as_secs()),
            );
        } else if let Some(names) = join(response.expose_headers.iter().map(|h| h.as_str())) {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, names);
        }

        headers
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> Option<HeaderValue> {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        return None;
    }
    HeaderValue::from_str(&joined).ok()
}
