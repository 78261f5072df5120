//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the database pool and optionally create the event table
//! - Build the geolocation client and the user agent parser
//! - Compile the origin policy for the configured tier
//! - Assemble the `HttpServer`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener is bound by the caller, after this returns

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::enrichment::{Enricher, GeoError, GeoLookup, IpInfoClient, UaParser, UaParserError};
use crate::http::{AppState, HttpServer};
use crate::ingest::Ingestor;
use crate::security::{AdmissionEngine, OriginPolicy};
use crate::store::{self, EventStore, PgEventStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Geolocation client: {0}")]
    Geo(#[from] GeoError),

    #[error("User agent rules: {0}")]
    UserAgent(#[from] UaParserError),
}

/// Build every production dependency and the server around them.
pub async fn bootstrap(config: ServiceConfig) -> Result<HttpServer, StartupError> {
    let pool = store::postgres::create_pool(&config.database).await?;
    let pg = PgEventStore::new(
        pool,
        &config.database.schema,
        &config.database.table,
        Duration::from_secs(config.timeouts.persist_secs),
    );
    if config.database.create_table {
        pg.ensure_table().await?;
    }
    tracing::info!(
        host = %config.database.host,
        database = %config.database.name,
        schema = %config.database.schema,
        table = %config.database.table,
        "Event store ready"
    );

    let geo = IpInfoClient::new(
        &config.enrichment.ipinfo_base_url,
        config.enrichment.ipinfo_token.clone(),
        Duration::from_millis(config.enrichment.geo_timeout_ms),
    )?;
    if config.enrichment.ipinfo_token.is_empty() {
        tracing::warn!("No ipinfo token configured, geolocation is anonymous");
    }

    build_server(config, Arc::new(pg), Arc::new(geo))
}

/// Assemble the server from an already constructed store and geolocation
/// backend.
pub fn build_server(
    config: ServiceConfig,
    store: Arc<dyn EventStore>,
    geo: Arc<dyn GeoLookup>,
) -> Result<HttpServer, StartupError> {
    let ua_parser = match &config.enrichment.user_agent_regexes {
        Some(path) => UaParser::from_file(Path::new(path))?,
        None => UaParser::builtin()?,
    };

    let enricher = Enricher::new(
        geo,
        Arc::new(ua_parser),
        Duration::from_millis(config.enrichment.geo_timeout_ms),
    );
    let ingestor = Arc::new(Ingestor::new(enricher, store.clone()));

    let policy = OriginPolicy::from_config(&config.cors);
    tracing::info!(
        environment = %policy.environment(),
        exact_origins = policy.exact_origins().len(),
        patterns = policy.patterns().len(),
        "Origin policy loaded"
    );
    let admission = AdmissionEngine::new(Arc::new(policy));

    let state = AppState {
        ingestor,
        store,
        max_body_size: config.security.max_body_size,
        trust_forwarded_headers: config.security.trust_forwarded_headers,
        request_timeout: Duration::from_secs(config.timeouts.request_secs),
    };

    Ok(HttpServer::new(config, state, admission))
}
