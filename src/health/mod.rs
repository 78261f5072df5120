//! Liveness and readiness endpoints.
//!
//! # Design Decisions
//! - `/health` is readiness: it succeeds only when the store answers a ping
//! - `/` is liveness: it never touches a dependency

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::AppState;

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    message: &'static str,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthBody {
                status: "success",
                message: "API is healthy",
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthBody {
                    status: "error",
                    message: "Database is disconnected",
                }),
            )
                .into_response()
        }
    }
}

/// `GET /`
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "Server is running"}))
}
