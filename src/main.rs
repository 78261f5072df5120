//! Event collector (v1)
//!
//! An analytics event ingestion service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                ┌──────────────────────────────────────────────┐
//!     ──────────────────────▶│  http server ──▶ cors middleware (security)  │
//!                            │                        │                     │
//!                            │                        ▼                     │
//!                            │              ingest pipeline                 │
//!                            │      bind ──▶ enrich ──▶ serialize ──▶ store │──▶ Postgres
//!                            │                 │                            │
//!                            │                 ▼                            │
//!                            │      ipinfo (geo) + uaparser (user agent)    │──▶ ipinfo.io
//!                            │                                              │
//!                            │  config · observability · lifecycle         │
//!                            └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use event_collector::config::load_config;
use event_collector::lifecycle::{bootstrap, shutdown_signal, Shutdown};
use event_collector::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "event-collector", version, about = "Analytics event collector")]
struct Args {
    /// Optional TOML configuration file; environment variables override it
    #[arg(short, long, env = "COLLECTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("event-collector v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        environment = %config.cors.environment,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = match bootstrap(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
