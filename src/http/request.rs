//! Request inspection.
//!
//! # Responsibilities
//! - Resolve the client address (forwarding headers, then TCP peer)
//! - Read the raw user agent
//! - Request id header shared by the set/propagate layers
//!
//! # Design Decisions
//! - The left-most valid X-Forwarded-For entry is the client
//! - Unparseable forwarding entries are skipped, never echoed
//! - Forwarding headers are ignored when not trusted

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, HeaderName};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Resolve the client IP. Empty when nothing is known.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .find_map(parse_ip);
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_ip);
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

/// The raw `User-Agent` header, empty when absent or not visible ASCII.
pub fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
