//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Insert target qualifiers must be plain SQL identifiers
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("{field} must be a plain SQL identifier, got '{value}'")]
    Identifier { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid ipinfo base URL '{0}'")]
    BaseUrl(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error(
        "timeouts.request_secs ({request_ms}ms) must exceed enrichment.geo_timeout_ms \
         plus timeouts.persist_secs ({budget_ms}ms)"
    )]
    RequestBudget { request_ms: u64, budget_ms: u64 },
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for (field, value) in [
        ("database.schema", &config.database.schema),
        ("database.table", &config.database.table),
    ] {
        if !is_identifier(value) {
            errors.push(ValidationError::Identifier {
                field,
                value: value.clone(),
            });
        }
    }

    for (field, value) in [
        ("database.max_connections", u64::from(config.database.max_connections)),
        ("database.acquire_timeout_secs", config.database.acquire_timeout_secs),
        ("enrichment.geo_timeout_ms", config.enrichment.geo_timeout_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.persist_secs", config.timeouts.persist_secs),
        ("security.max_body_size", config.security.max_body_size as u64),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    let budget_ms = config
        .enrichment
        .geo_timeout_ms
        .saturating_add(config.timeouts.persist_secs.saturating_mul(1000));
    if config.timeouts.request_secs > 0 && request_ms <= budget_ms {
        errors.push(ValidationError::RequestBudget {
            request_ms,
            budget_ms,
        });
    }

    if url::Url::parse(&config.enrichment.ipinfo_base_url).is_err() {
        errors.push(ValidationError::BaseUrl(
            config.enrichment.ipinfo_base_url.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
