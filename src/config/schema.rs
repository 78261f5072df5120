//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the collector.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the event collector.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Event store connection settings.
    pub database: DatabaseConfig,

    /// Cross-origin admission policy.
    pub cors: CorsConfig,

    /// Geolocation and user-agent enrichment.
    pub enrichment: EnrichmentConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Postgres connection and insert target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,

    /// Schema qualifying the insert target. Trusted deployment configuration.
    pub schema: String,

    /// Table receiving one row per event.
    pub table: String,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,

    /// Create the event table at startup when it does not exist.
    pub create_table: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "postgres".to_string(),
            schema: "public".to_string(),
            table: "event".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            create_table: false,
        }
    }
}

/// Deployment tier selecting the origin matching strategy.
///
/// Anything other than `production` or `staging`, including an unset value,
/// is treated as development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    #[default]
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value.trim() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        Environment::from(value.as_str())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-origin admission configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Deployment tier.
    pub environment: Environment,

    /// Origins admitted on exact match (production only).
    pub allowed_origins: Vec<String>,

    /// Pattern rules (production only). Literal origins gain the preview
    /// subdomain slot; entries wrapped in slashes are free-form regexes.
    pub allowed_patterns: Vec<String>,
}

/// Enrichment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// ipinfo API token. Empty means anonymous (rate limited) access.
    pub ipinfo_token: String,

    /// ipinfo API base URL.
    pub ipinfo_base_url: String,

    /// Upper bound on a single geolocation lookup, in milliseconds.
    pub geo_timeout_ms: u64,

    /// Optional uap-core `regexes.yaml` replacing the built-in rule set.
    pub user_agent_regexes: Option<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            ipinfo_token: String::new(),
            ipinfo_base_url: "https://ipinfo.io".to_string(),
            geo_timeout_ms: 2_000,
            user_agent_regexes: None,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upper bound on a single insert, in seconds.
    pub persist_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            persist_secs: 5,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Resolve the client address from X-Forwarded-For / X-Real-IP.
    pub trust_forwarded_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
            trust_forwarded_headers: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format: "text" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
