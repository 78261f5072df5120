//! Event ingestion pipeline.
//!
//! # State Machine
//! ```text
//! RECEIVED → BOUND → (ENRICHED | SKIPPED) → SERIALIZED → PERSISTED → ACKNOWLEDGED
//!     └──────────┴──────────────┴──────────────┴── failure ──→ REJECTED
//! ```
//!
//! # Design Decisions
//! - Linear: no stage is revisited, nothing is retried
//! - Enrichment failure is not a rejection
//! - One insert per accepted event

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::enrichment::Enricher;
use crate::ingest::event::{Event, RequestContext};
use crate::observability::metrics;
use crate::store::{EventStore, StoreError};

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Bound,
    Enriched,
    Skipped,
    Serialized,
    Persisted,
    Acknowledged,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Bound => "bound",
            Stage::Enriched => "enriched",
            Stage::Skipped => "skipped",
            Stage::Serialized => "serialized",
            Stage::Persisted => "persisted",
            Stage::Acknowledged => "acknowledged",
        }
    }
}

/// Why an event was rejected.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed binding event: {0}")]
    Bind(#[source] serde_json::Error),

    #[error("Failed serializing event: {source}")]
    Serialize {
        /// `Enriched` or `Skipped`, whichever the event reached.
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed saving event: {0}")]
    Persist(#[from] StoreError),
}

impl IngestError {
    /// The last stage reached before rejection.
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::Bind(_) => Stage::Received,
            IngestError::Serialize { stage, .. } => *stage,
            IngestError::Persist(_) => Stage::Serialized,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Bind(_) => "bind",
            IngestError::Serialize { .. } => "serialize",
            IngestError::Persist(_) => "persist",
        }
    }
}

/// Proof that an event was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub created_at: DateTime<Utc>,
    pub enriched: bool,
}

/// Validates, enriches and persists events.
pub struct Ingestor {
    enricher: Enricher,
    store: Arc<dyn EventStore>,
}

impl Ingestor {
    pub fn new(enricher: Enricher, store: Arc<dyn EventStore>) -> Self {
        Self { enricher, store }
    }

    /// Run one request body through the pipeline.
    pub async fn record(&self, body: &[u8], ctx: RequestContext) -> Result<Receipt, IngestError> {
        let started = Instant::now();
        let result = self.run(body, ctx).await;

        match &result {
            Ok(receipt) => {
                tracing::debug!(
                    created_at = %receipt.created_at,
                    enriched = receipt.enriched,
                    stage = Stage::Acknowledged.as_str(),
                    "Event recorded"
                );
                metrics::record_event("ok", started);
            }
            Err(e) => {
                tracing::error!(error = %e, stage = e.stage().as_str(), "Event rejected");
                metrics::record_event(e.kind(), started);
            }
        }

        result
    }

    async fn run(&self, body: &[u8], ctx: RequestContext) -> Result<Receipt, IngestError> {
        let mut event = Event::from_json(body).map_err(IngestError::Bind)?;
        event.attach(ctx);

        let stage = if event.deep {
            let enrichment = self.enricher.enrich(&event.ip, &event.user_agent).await;
            event.apply(enrichment);
            Stage::Enriched
        } else {
            Stage::Skipped
        };
        tracing::trace!(stage = stage.as_str(), "Event bound");

        let payload = event
            .to_payload()
            .map_err(|source| IngestError::Serialize { stage, source })?;
        let created_at = self.store.insert(&payload).await?;

        Ok(Receipt {
            created_at,
            enriched: stage == Stage::Enriched,
        })
    }
}
