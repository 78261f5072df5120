//! Cross-origin middleware.
//! Applies the admission engine to every request.

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::observability::metrics;
use crate::security::{Admission, AdmissionEngine};

pub async fn cors_middleware(
    State(engine): State<AdmissionEngine>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();
    let admission = engine.admit(origin.as_ref());

    // 1. Same-origin and non-browser callers: nothing to do.
    if admission == Admission::NotCors {
        return next.run(req).await;
    }

    let tier = engine.policy().environment().as_str();
    metrics::record_origin_decision(tier, admission.as_str());
    tracing::debug!(
        origin = ?origin,
        tier,
        decision = admission.as_str(),
        "Origin evaluated"
    );

    // 2. Pre-flight: answer directly, with grants only when admitted.
    if req.method() == Method::OPTIONS {
        let headers = engine.response_headers(&admission, true);
        return (StatusCode::NO_CONTENT, headers).into_response();
    }

    // 3. Actual request: run the handler, attach headers when admitted.
    let mut response = next.run(req).await;
    let headers = engine.response_headers(&admission, false);
    response.headers_mut().extend(headers);
    response
}
