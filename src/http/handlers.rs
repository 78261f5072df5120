use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::{client_ip, user_agent};
use crate::http::server::AppState;
use crate::ingest::RequestContext;
use crate::resilience::with_timeout;

const OK: &str = "OK";
const KO: &str = "KO";

/// `POST /record_event`
///
/// Answers `200 OK` or `400 KO` and nothing else. The request deadline
/// covers the body upload and the pipeline; expiry is a `KO`.
pub async fn record_event(State(state): State<AppState>, request: Request<Body>) -> Response {
    let outcome = with_timeout(state.request_timeout, ingest(&state, request)).await;

    let accepted = outcome.unwrap_or_else(|elapsed| {
        tracing::warn!(error = %elapsed, "Event request deadline passed");
        false
    });

    if accepted {
        (StatusCode::OK, OK).into_response()
    } else {
        (StatusCode::BAD_REQUEST, KO).into_response()
    }
}

async fn ingest(state: &AppState, request: Request<Body>) -> bool {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let ctx = RequestContext {
        ip: client_ip(&parts.headers, peer, state.trust_forwarded_headers),
        user_agent: user_agent(&parts.headers),
    };

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed reading event body");
            return false;
        }
    };

    state.ingestor.record(&body, ctx).await.is_ok()
}
