//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use event_collector::config::ServiceConfig;
use event_collector::enrichment::{GeoError, GeoLookup, GeoRecord};
use event_collector::lifecycle::{build_server, Shutdown};
use event_collector::store::{self, EventStore, StoreError};

pub const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// In-memory event store. Each insert is one row stamped with the clock.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<(DateTime<Utc>, Value)>>,
    down: AtomicBool,
}

impl MemoryStore {
    pub fn rows(&self) -> Vec<(DateTime<Utc>, Value)> {
        self.rows.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, payload: &str) -> store::Result<DateTime<Utc>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::ZERO));
        }
        let details: Value = serde_json::from_str(payload).unwrap();

        let created_at = Utc::now();
        self.rows.lock().unwrap().push((created_at, details));
        Ok(created_at)
    }

    async fn ping(&self) -> store::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::ZERO));
        }
        Ok(())
    }
}

/// Geolocation stub answering every valid lookup with a US record.
pub struct StubGeo;

#[async_trait]
impl GeoLookup for StubGeo {
    async fn lookup(&self, ip: &str) -> Result<GeoRecord, GeoError> {
        if ip.is_empty() {
            return Err(GeoError::InvalidIp(ip.to_string()));
        }
        Ok(GeoRecord {
            ip: Some(ip.to_string()),
            city: Some("Mountain View".into()),
            country: Some("US".into()),
            ..GeoRecord::default()
        })
    }
}

/// Geolocation backend that never answers in time.
pub struct SlowGeo(pub Duration);

#[async_trait]
impl GeoLookup for SlowGeo {
    async fn lookup(&self, _ip: &str) -> Result<GeoRecord, GeoError> {
        tokio::time::sleep(self.0).await;
        Ok(GeoRecord::default())
    }
}

/// A running collector on an ephemeral port. Dropping it stops the server.
pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_server(
    config: ServiceConfig,
    store: Arc<dyn EventStore>,
    geo: Arc<dyn GeoLookup>,
) -> TestServer {
    let server = build_server(config, store, geo).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestServer {
        addr,
        _shutdown: shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a programmable raw-TCP backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                // Drain the request head before answering.
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    429 => "429 Too Many Requests",
                    500 => "500 Internal Server Error",
                    _ => "200 OK",
                };

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
