//! Concurrent multi-source ingestion with a single writer.
//!
//! Matching and index updates are not atomic as a unit, so the correlator
//! must only ever be mutated by one writer at a time. [`SharedCorrelator`]
//! guards it with an async `RwLock`; [`IngestHandle`] funnels batches from
//! any number of producers through an mpsc channel drained by one task.
//! Deduplication holds the write lock for its whole pass, so readers see
//! the store either before or after it, never halfway.

use crate::config::EnrichmentConfig;
use crate::correlator::AssetCorrelator;
use crate::models::{
    AssetRecord, EndpointRecord, EnrichedAsset, GapReport, NetworkObservationRecord,
    OwnerMappingRecord, VulnerabilityRecord,
};
use crate::telemetry::RecordKind;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Errors raised by the ingestion pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The ingest worker has stopped accepting batches.
    #[error("Ingest worker is closed")]
    WorkerClosed,

    /// The ingest worker task panicked or was cancelled.
    #[error("Ingest worker failed: {0}")]
    WorkerFailed(String),

    /// A record feed failed to produce its next batch.
    #[error("Feed '{feed}' failed: {message}")]
    Feed { feed: String, message: String },
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// One batch of a single record kind.
#[derive(Debug, Clone)]
pub enum IngestBatch {
    Assets(Vec<AssetRecord>),
    Endpoints(Vec<EndpointRecord>),
    Vulnerabilities(Vec<VulnerabilityRecord>),
    OwnerMappings(Vec<OwnerMappingRecord>),
    NetworkObservations(Vec<NetworkObservationRecord>),
}

impl IngestBatch {
    /// Record kind carried by this batch.
    pub fn kind(&self) -> RecordKind {
        match self {
            IngestBatch::Assets(_) => RecordKind::Asset,
            IngestBatch::Endpoints(_) => RecordKind::Endpoint,
            IngestBatch::Vulnerabilities(_) => RecordKind::Vulnerability,
            IngestBatch::OwnerMappings(_) => RecordKind::OwnerMapping,
            IngestBatch::NetworkObservations(_) => RecordKind::NetworkObservation,
        }
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        match self {
            IngestBatch::Assets(r) => r.len(),
            IngestBatch::Endpoints(r) => r.len(),
            IngestBatch::Vulnerabilities(r) => r.len(),
            IngestBatch::OwnerMappings(r) => r.len(),
            IngestBatch::NetworkObservations(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feeds the batch to the matching ingest operation.
    pub fn apply(self, correlator: &mut AssetCorrelator) -> usize {
        match self {
            IngestBatch::Assets(r) => correlator.ingest_assets(r),
            IngestBatch::Endpoints(r) => correlator.ingest_endpoints(r),
            IngestBatch::Vulnerabilities(r) => correlator.ingest_vulnerabilities(r),
            IngestBatch::OwnerMappings(r) => correlator.ingest_owner_mappings(r),
            IngestBatch::NetworkObservations(r) => correlator.ingest_network_observations(r),
        }
    }
}

/// A correlator shared between async tasks.
#[derive(Debug, Clone, Default)]
pub struct SharedCorrelator {
    inner: Arc<RwLock<AssetCorrelator>>,
}

impl SharedCorrelator {
    /// Wraps an existing correlator.
    pub fn new(correlator: AssetCorrelator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(correlator)),
        }
    }

    /// Applies one batch under the write lock.
    pub async fn ingest(&self, batch: IngestBatch) -> usize {
        let mut correlator = self.inner.write().await;
        batch.apply(&mut correlator)
    }

    /// Runs deduplication under the write lock.
    pub async fn deduplicate(&self) -> usize {
        self.inner.write().await.deduplicate()
    }

    pub async fn gap_analysis(&self, source_a: &str, source_b: &str) -> GapReport {
        self.inner.read().await.gap_analysis(source_a, source_b)
    }

    pub async fn asset_count(&self) -> usize {
        self.inner.read().await.asset_count()
    }

    /// Owned copy of the current store.
    pub async fn snapshot(&self) -> Vec<EnrichedAsset> {
        self.inner.read().await.snapshot()
    }

    /// Read access for queries not covered above.
    pub async fn read(&self) -> RwLockReadGuard<'_, AssetCorrelator> {
        self.inner.read().await
    }

    /// Starts the single writer task and returns a handle for producers.
    pub fn spawn_worker(&self, buffer: usize) -> IngestHandle {
        let (sender, mut receiver) = mpsc::channel::<IngestBatch>(buffer.max(1));
        let shared = self.clone();

        let task = tokio::spawn(async move {
            let mut total = 0;
            while let Some(batch) = receiver.recv().await {
                let kind = batch.kind();
                let processed = shared.ingest(batch).await;
                debug!(kind = %kind, processed, "Worker applied batch");
                total += processed;
            }
            info!(total, "Ingest worker drained");
            total
        });

        IngestHandle { sender, task }
    }
}

/// Producer-side handle to the single ingest worker.
#[derive(Debug)]
pub struct IngestHandle {
    sender: mpsc::Sender<IngestBatch>,
    task: JoinHandle<usize>,
}

impl IngestHandle {
    /// Queues a batch for the worker.
    pub async fn submit(&self, batch: IngestBatch) -> PipelineResult<()> {
        self.sender
            .send(batch)
            .await
            .map_err(|_| PipelineError::WorkerClosed)
    }

    /// A sender producers can clone and move into their own tasks.
    pub fn sender(&self) -> mpsc::Sender<IngestBatch> {
        self.sender.clone()
    }

    /// Closes the queue, waits for the worker to finish and returns the
    /// number of records it processed.
    ///
    /// Clones obtained from [`IngestHandle::sender`] must be dropped first,
    /// or this waits for them.
    pub async fn shutdown(self) -> PipelineResult<usize> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| PipelineError::WorkerFailed(e.to_string()))
    }
}

/// A producer of record batches: a connector, a file parser, a fixture.
#[async_trait]
pub trait RecordFeed: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Returns the next batch, or `None` once the feed is exhausted.
    async fn next_batch(&mut self) -> PipelineResult<Option<IngestBatch>>;
}

/// A feed over batches that are already in memory.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    name: String,
    batches: std::collections::VecDeque<IngestBatch>,
}

impl StaticFeed {
    pub fn new(name: impl Into<String>, batches: Vec<IngestBatch>) -> Self {
        Self {
            name: name.into(),
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl RecordFeed for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_batch(&mut self) -> PipelineResult<Option<IngestBatch>> {
        Ok(self.batches.pop_front())
    }
}

/// Forwards every batch of `feed` to the worker. Returns the number of
/// records forwarded.
///
/// A feed error stops this feed only; other feeds keep going.
#[instrument(skip_all, fields(feed = %feed.name()))]
pub async fn drain_feed<F>(feed: &mut F, handle: &IngestHandle) -> PipelineResult<usize>
where
    F: RecordFeed + ?Sized,
{
    let mut forwarded = 0;
    loop {
        let batch = match feed.next_batch().await {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, forwarded, "Feed failed");
                return Err(e);
            }
        };
        if batch.is_empty() {
            continue;
        }
        forwarded += batch.len();
        handle.submit(batch).await?;
    }
    debug!(forwarded, "Feed exhausted");
    Ok(forwarded)
}

/// Outcome of the post-ingestion enrichment phase.
#[derive(Debug, Clone)]
pub struct EnrichmentSummary {
    /// Merges performed by deduplication (0 if disabled).
    pub merges: usize,
    /// Enriched assets after deduplication.
    pub asset_count: usize,
    /// One report per configured source pair, in configuration order.
    pub gap_reports: Vec<GapReport>,
}

/// Deduplicates if configured, then computes each configured gap report.
pub async fn run_enrichment(
    shared: &SharedCorrelator,
    config: &EnrichmentConfig,
) -> EnrichmentSummary {
    let merges = if config.deduplicate {
        let merges = shared.deduplicate().await;
        if merges > 0 {
            info!(merges, "Deduplicated asset pairs");
        }
        merges
    } else {
        0
    };

    let correlator = shared.read().await;
    let gap_reports: Vec<GapReport> = config
        .gap_pairs()
        .map(|(a, b)| {
            let report = correlator.gap_analysis(a, b);
            info!(summary = %report.summary(), "Gap analysis");
            report
        })
        .collect();

    let summary = EnrichmentSummary {
        merges,
        asset_count: correlator.asset_count(),
        gap_reports,
    };
    info!(assets = summary.asset_count, "Enrichment complete");
    summary
}
