//! Event enrichment subsystem.
//!
//! # Data Flow
//! ```text
//! Event with Deep = true
//!     → geo.rs (ip → GeoRecord, bounded by a timeout)
//!     → user_agent.rs (raw UA → ParsedUserAgent, total)
//!     → enrichment fields set on the event
//! ```
//!
//! # Design Decisions
//! - Geolocation failure or timeout degrades to an empty record
//! - User agent parsing never fails
//! - Both run inline on the request path

pub mod geo;
pub mod user_agent;

use std::sync::Arc;
use std::time::Duration;

pub use geo::{GeoError, GeoLookup, GeoRecord, IpInfoClient};
pub use user_agent::{ParsedUserAgent, UaParser, UaParserError};

use crate::observability::metrics;
use crate::resilience::with_timeout;

/// Result of enriching one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub geo: Option<GeoRecord>,
    pub user_agent: ParsedUserAgent,
}

/// Combines the geolocation lookup and the user agent parser.
pub struct Enricher {
    geo: Arc<dyn GeoLookup>,
    user_agent: Arc<UaParser>,
    geo_timeout: Duration,
}

impl Enricher {
    pub fn new(geo: Arc<dyn GeoLookup>, user_agent: Arc<UaParser>, geo_timeout: Duration) -> Self {
        Self {
            geo,
            user_agent,
            geo_timeout,
        }
    }

    /// Enrich from the resolved client IP and raw user agent.
    pub async fn enrich(&self, ip: &str, user_agent: &str) -> Enrichment {
        Enrichment {
            geo: self.locate(ip).await,
            user_agent: self.user_agent.parse(user_agent),
        }
    }

    async fn locate(&self, ip: &str) -> Option<GeoRecord> {
        let result = match with_timeout(self.geo_timeout, self.geo.lookup(ip)).await {
            Ok(result) => result,
            Err(elapsed) => Err(GeoError::Timeout(elapsed.0)),
        };

        match result {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(ip, error = %e, "Geolocation lookup failed");
                metrics::record_enrichment_failure(e.kind());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedGeo(Option<GeoRecord>);

    #[async_trait]
    impl GeoLookup for FixedGeo {
        async fn lookup(&self, ip: &str) -> Result<GeoRecord, GeoError> {
            self.0.clone().ok_or_else(|| GeoError::InvalidIp(ip.to_string()))
        }
    }

    struct SlowGeo;

    #[async_trait]
    impl GeoLookup for SlowGeo {
        async fn lookup(&self, _ip: &str) -> Result<GeoRecord, GeoError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(GeoRecord::default())
        }
    }

    fn enricher(geo: impl GeoLookup + 'static) -> Enricher {
        Enricher::new(
            Arc::new(geo),
            Arc::new(UaParser::builtin().unwrap()),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_successful_lookup() {
        let record = GeoRecord {
            country: Some("DE".to_string()),
            ..GeoRecord::default()
        };
        let enrichment = enricher(FixedGeo(Some(record.clone())))
            .enrich("1.2.3.4", "curl/8.4.0")
            .await;

        assert_eq!(enrichment.geo, Some(record));
        assert_eq!(enrichment.user_agent.name, "curl");
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades() {
        let enrichment = enricher(FixedGeo(None)).enrich("1.2.3.4", "").await;
        assert_eq!(enrichment.geo, None);
        assert_eq!(enrichment.user_agent, ParsedUserAgent::default());
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out() {
        let started = std::time::Instant::now();
        let enrichment = enricher(SlowGeo).enrich("1.2.3.4", "").await;
        assert_eq!(enrichment.geo, None);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
