//! IP geolocation lookup.
//!
//! # Responsibilities
//! - Resolve an IP address to a location/ownership record
//! - Reject unparseable addresses before any network call
//!
//! # Design Decisions
//! - Lookup is a trait so the pipeline does not depend on a provider
//! - The ipinfo client shares one connection pool across requests

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors that can occur during a geolocation lookup.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Invalid IP address: '{0}'")]
    InvalidIp(String),

    #[error("Lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Lookup provider returned {0}")]
    Status(StatusCode),

    #[error("Invalid lookup URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

impl GeoError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GeoError::InvalidIp(_) => "invalid_ip",
            GeoError::Request(_) => "request",
            GeoError::Status(_) => "status",
            GeoError::Url(_) => "url",
            GeoError::Timeout(_) => "timeout",
        }
    }
}

/// Geolocation and ownership record, shaped after the ipinfo core response.
///
/// The core fields are typed; everything else the provider returns (`asn`,
/// `company`, `privacy`, `abuse`, `domains`, ...) is carried through as-is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeoRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bogon: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub anycast: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Resolves IP addresses to geolocation records.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<GeoRecord, GeoError>;
}

/// ipinfo.io HTTP client.
#[derive(Debug, Clone)]
pub struct IpInfoClient {
    client: reqwest::Client,
    base_url: url::Url,
    token: String,
}

impl IpInfoClient {
    /// Create a client against `base_url` (e.g. `https://ipinfo.io`).
    ///
    /// `timeout` bounds each HTTP exchange; an empty `token` issues
    /// anonymous requests.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("event-collector/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: url::Url::parse(base_url)?,
            token: token.into(),
        })
    }

    fn url_for(&self, ip: IpAddr) -> Result<url::Url, GeoError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GeoError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(&ip.to_string())
            .push("json");
        Ok(url)
    }
}

#[async_trait]
impl GeoLookup for IpInfoClient {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn lookup(&self, ip: &str) -> Result<GeoRecord, GeoError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| GeoError::InvalidIp(ip.to_string()))?;

        let mut request = self.client.get(self.url_for(addr)?);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status));
        }

        Ok(response.json::<GeoRecord>().await?)
    }
}
