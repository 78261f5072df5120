//! Origin policy: the immutable, process-wide admission configuration.

use std::time::Duration;

use axum::http::{header, HeaderName, Method};

use crate::config::{CorsConfig, Environment};
use crate::security::pattern::OriginPattern;

const MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Headers emitted alongside an admitted origin.
#[derive(Debug, Clone)]
pub struct CorsResponseConfig {
    pub allow_methods: Vec<Method>,
    pub allow_headers: Vec<HeaderName>,
    pub expose_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
    pub max_age: Duration,
}

impl CorsResponseConfig {
    /// Header set used by the production and development tiers.
    pub fn restrictive() -> Self {
        Self {
            allow_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::HEAD,
            ],
            allow_headers: vec![
                header::ACCEPT,
                header::ACCEPT_LANGUAGE,
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::ACCEPT_ENCODING,
                HeaderName::from_static("x-csrf-token"),
                header::AUTHORIZATION,
                header::CACHE_CONTROL,
                HeaderName::from_static("x-requested-with"),
                header::ORIGIN,
                HeaderName::from_static("sentry-trace"),
                HeaderName::from_static("baggage"),
            ],
            expose_headers: vec![header::CONTENT_LENGTH],
            allow_credentials: true,
            max_age: MAX_AGE,
        }
    }

    /// Permissive default used by the staging tier. No credentials.
    pub fn permissive() -> Self {
        Self {
            allow_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::HEAD,
                Method::OPTIONS,
            ],
            allow_headers: vec![header::ORIGIN, header::CONTENT_LENGTH, header::CONTENT_TYPE],
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: MAX_AGE,
        }
    }
}

/// Process-wide admission policy, built once from configuration.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    environment: Environment,
    exact: Vec<String>,
    patterns: Vec<OriginPattern>,
    response: CorsResponseConfig,
}

impl OriginPolicy {
    /// Build the policy for the configured tier.
    ///
    /// Only production consults the origin and pattern lists. Malformed
    /// pattern entries are logged and left out.
    pub fn from_config(config: &CorsConfig) -> Self {
        match config.environment {
            Environment::Production => {
                let exact = config
                    .allowed_origins
                    .iter()
                    .map(|o| o.trim())
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect();

                let patterns = config
                    .allowed_patterns
                    .iter()
                    .filter_map(|entry| match OriginPattern::compile(entry) {
                        Ok(pattern) => pattern,
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring origin pattern");
                            None
                        }
                    })
                    .collect();

                Self::new(
                    Environment::Production,
                    exact,
                    patterns,
                    CorsResponseConfig::restrictive(),
                )
            }
            Environment::Staging => Self::new(
                Environment::Staging,
                Vec::new(),
                Vec::new(),
                CorsResponseConfig::permissive(),
            ),
            Environment::Development => Self::new(
                Environment::Development,
                Vec::new(),
                Vec::new(),
                CorsResponseConfig::restrictive(),
            ),
        }
    }

    pub fn new(
        environment: Environment,
        exact: Vec<String>,
        patterns: Vec<OriginPattern>,
        response: CorsResponseConfig,
    ) -> Self {
        Self {
            environment,
            exact,
            patterns,
            response,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn exact_origins(&self) -> &[String] {
        &self.exact
    }

    pub fn patterns(&self) -> &[OriginPattern] {
        &self.patterns
    }

    pub fn response(&self) -> &CorsResponseConfig {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production(origins: &[&str], patterns: &[&str]) -> CorsConfig {
        CorsConfig {
            environment: Environment::Production,
            allowed_origins: origins.iter().map(|s| s.to_string()).collect(),
            allowed_patterns: patterns.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_production_trims_and_drops_empty() {
        let policy = OriginPolicy::from_config(&production(
            &[" https://a.example.com ", "", "  "],
            &["https://app.example.com", " ", "/(broken/"],
        ));

        assert_eq!(policy.exact_origins(), ["https://a.example.com"]);
        assert_eq!(policy.patterns().len(), 1);
        assert!(policy.response().allow_credentials);
    }

    #[test]
    fn test_other_tiers_ignore_lists() {
        let mut config = production(&["https://a.example.com"], &["https://b.example.com"]);

        config.environment = Environment::Staging;
        let staging = OriginPolicy::from_config(&config);
        assert!(staging.exact_origins().is_empty());
        assert!(staging.patterns().is_empty());
        assert!(!staging.response().allow_credentials);

        config.environment = Environment::Development;
        let development = OriginPolicy::from_config(&config);
        assert!(development.exact_origins().is_empty());
        assert!(development.response().allow_credentials);
    }
}
