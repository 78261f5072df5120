//! The event document: caller fields, server fields, enrichment fields.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enrichment::{Enrichment, GeoRecord, ParsedUserAgent};

/// One submitted event.
///
/// Binding is structural only: unknown fields are ignored, missing or
/// `null` fields take their zero value, and a field of the wrong JSON type
/// fails the bind. Keys match case-insensitively, the last one winning.
/// `Ip` and `UserAgent` are type-checked when present but always overwritten
/// from the request; the enrichment fields are never read from the body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "Cookie", deserialize_with = "null_as_default")]
    pub cookie: String,
    #[serde(rename = "Referrer", deserialize_with = "null_as_default")]
    pub referrer: String,
    #[serde(rename = "Page", deserialize_with = "null_as_default")]
    pub page: String,
    #[serde(rename = "Event_name", deserialize_with = "null_as_default")]
    pub event_name: String,
    #[serde(rename = "UserID")]
    pub user_id: Option<String>,
    #[serde(rename = "Size", deserialize_with = "null_as_default")]
    pub size: String,
    #[serde(rename = "Language", deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(rename = "Deep", deserialize_with = "null_as_default")]
    pub deep: bool,
    #[serde(rename = "Details")]
    pub details: Option<Map<String, Value>>,

    #[serde(rename = "Ip", deserialize_with = "null_as_default")]
    pub ip: String,
    #[serde(rename = "UserAgent", deserialize_with = "null_as_default")]
    pub user_agent: String,

    #[serde(rename = "IpData", skip_deserializing)]
    pub ip_data: Option<GeoRecord>,
    #[serde(rename = "UserAgentData", skip_deserializing)]
    pub user_agent_data: ParsedUserAgent,
}

/// Request-derived values attached to every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Resolved client address, empty when unknown.
    pub ip: String,
    /// Raw `User-Agent` header, empty when absent.
    pub user_agent: String,
}

/// Wire names of the fields a caller may send.
const BOUND_FIELDS: &[&str] = &[
    "Cookie",
    "Referrer",
    "Page",
    "Event_name",
    "UserID",
    "Size",
    "Language",
    "Deep",
    "Details",
    "Ip",
    "UserAgent",
];

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level body with its keys folded onto the canonical field names.
///
/// Entries are visited in document order so a later duplicate replaces an
/// earlier one. Keys matching no field are dropped.
struct FoldedBody(Map<String, Value>);

impl<'de> Deserialize<'de> for FoldedBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FoldedVisitor;

        impl<'de> Visitor<'de> for FoldedVisitor {
            type Value = FoldedBody;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an event object")
            }

            // A literal `null` body binds nothing.
            fn visit_unit<E: de::Error>(self) -> Result<FoldedBody, E> {
                Ok(FoldedBody(Map::new()))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FoldedBody, A::Error> {
                let mut fields = Map::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    if let Some(name) = canonical_field(&key) {
                        fields.insert(name.to_string(), value);
                    }
                }
                Ok(FoldedBody(fields))
            }
        }

        deserializer.deserialize_any(FoldedVisitor)
    }
}

fn canonical_field(key: &str) -> Option<&'static str> {
    BOUND_FIELDS
        .iter()
        .find(|name| **name == key)
        .or_else(|| BOUND_FIELDS.iter().find(|name| name.eq_ignore_ascii_case(key)))
        .copied()
}

impl Event {
    /// Bind a request body.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let FoldedBody(fields) = serde_json::from_slice(body)?;
        serde_json::from_value(Value::Object(fields))
    }

    /// Overwrite the server-derived fields.
    pub fn attach(&mut self, ctx: RequestContext) {
        self.ip = ctx.ip;
        self.user_agent = ctx.user_agent;
    }

    pub fn apply(&mut self, enrichment: Enrichment) {
        self.ip_data = enrichment.geo;
        self.user_agent_data = enrichment.user_agent;
    }

    /// Serialize to the opaque document stored as the row payload.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
