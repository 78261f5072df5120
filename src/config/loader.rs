//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Environment, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration.
///
/// Starts from the TOML file when one is given (defaults otherwise), then
/// applies environment overrides from the current process.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment environment variables onto `config`.
///
/// `lookup` abstracts the environment so the overlay can be tested without
/// touching process state. Empty values count as unset.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(env) = var("ENV") {
        config.cors.environment = Environment::from(env);
    }
    if let Some(origins) = var("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = split_list(&origins);
    }
    if let Some(patterns) = var("ALLOWED_PATTERNS") {
        config.cors.allowed_patterns = split_list(&patterns);
    }
    if let Some(token) = var("IPINFO_TOKEN") {
        config.enrichment.ipinfo_token = token;
    }
    if let Some(path) = var("UA_REGEXES") {
        config.enrichment.user_agent_regexes = Some(path);
    }
    if let Some(port) = var("PORT") {
        let port: u16 = port.trim().parse().map_err(|e| ConfigError::Env {
            name: "PORT",
            reason: format!("{e}"),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }
    if let Some(host) = var("DB_HOST") {
        config.database.host = host;
    }
    if let Some(port) = var("DB_PORT") {
        config.database.port = port.trim().parse().map_err(|e| ConfigError::Env {
            name: "DB_PORT",
            reason: format!("{e}"),
        })?;
    }
    if let Some(user) = var("DB_USER") {
        config.database.user = user;
    }
    if let Some(password) = var("DB_PASS") {
        config.database.password = password;
    }
    if let Some(name) = var("DB_NAME") {
        config.database.name = name;
    }
    if let Some(schema) = var("DB_SCHEMA") {
        config.database.schema = schema.trim().to_string();
    }
    if let Some(level) = var("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(format) = var("LOG_FORMAT") {
        config.observability.log_format = format;
    }

    Ok(())
}

/// Split a comma separated list. Entries are kept verbatim; trimming and
/// dropping empties is the origin policy's job.
fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overlay(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, |name| vars.get(name).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_env_overrides() {
        let config = overlay(&[
            ("ENV", "production"),
            ("ALLOWED_ORIGINS", "https://a.example.com, https://b.example.com"),
            ("ALLOWED_PATTERNS", "https://app.example.com,"),
            ("PORT", "9000"),
            ("DB_SCHEMA", "analytics"),
            ("IPINFO_TOKEN", "secret"),
            ("UA_REGEXES", "/etc/uap-core/regexes.yaml"),
        ])
        .unwrap();

        assert_eq!(config.cors.environment, Environment::Production);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example.com", " https://b.example.com"]
        );
        assert_eq!(config.cors.allowed_patterns.len(), 2);
        assert_eq!(config.listener.bind_address, "0.0.0.0:9000");
        assert_eq!(config.database.schema, "analytics");
        assert_eq!(config.enrichment.ipinfo_token, "secret");
        assert_eq!(
            config.enrichment.user_agent_regexes.as_deref(),
            Some("/etc/uap-core/regexes.yaml")
        );
    }

    #[test]
    fn test_unset_env_keeps_defaults() {
        let config = overlay(&[("ENV", ""), ("DB_SCHEMA", "   ")]).unwrap();
        assert_eq!(config.cors.environment, Environment::Development);
        assert_eq!(config.database.schema, "public");
    }

    #[test]
    fn test_invalid_port() {
        let err = overlay(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "PORT", .. }));
    }
}
