//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (cross-origin, timeout, request ID, tracing)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::health;
use crate::http::handlers;
use crate::http::middleware::cors_middleware;
use crate::http::request::X_REQUEST_ID;
use crate::ingest::Ingestor;
use crate::security::AdmissionEngine;
use crate::store::EventStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    pub store: Arc<dyn EventStore>,
    pub max_body_size: usize,
    pub trust_forwarded_headers: bool,
    /// Deadline for a whole `/record_event` exchange.
    pub request_timeout: Duration,
}

/// HTTP server for the event collector.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server around prepared state.
    pub fn new(config: ServiceConfig, state: AppState, admission: AdmissionEngine) -> Self {
        let router = Self::build_router(&config, state, admission);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request id is assigned before the trace span opens, and the
    /// cross-origin middleware answers pre-flights before any handler.
    /// `/record_event` enforces its own deadline so that expiry is a `KO`;
    /// the timeout layer covers the health routes only.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState, admission: AdmissionEngine) -> Router {
        let health_routes = Router::new()
            .route("/", get(health::root))
            .route("/health", get(health::health))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )));

        Router::new()
            .route("/record_event", post(handlers::record_event))
            .merge(health_routes)
            .with_state(state)
            .layer(from_fn_with_state(admission, cors_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone())),
            )
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.config.cors.environment,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
