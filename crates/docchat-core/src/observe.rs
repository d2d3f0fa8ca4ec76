//! Pipeline event reporting.
//!
//! Every component receives an `Arc<dyn PipelineObserver>` at construction
//! and reports what it skipped, clamped, or failed through it. There is no
//! process-wide logger in this crate: the application decides where events
//! go (tracing, JSON lines, nowhere), and tests record them.

use std::sync::Mutex;

use serde::Serialize;

/// Why a chunk was left out of a store batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    EmptyContent,
    EmbeddingFailed(String),
}

/// Something that happened inside the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// `overlap >= chunk_size`; the segmenter continued with `clamped`.
    OverlapClamped { requested: usize, clamped: usize },
    /// Document content was empty after trimming; no chunks produced.
    DocumentEmpty { source_id: String },
    /// The window start failed to advance; segmentation stopped early.
    SegmenterStalled {
        source_id: String,
        start: usize,
        next: usize,
    },
    DocumentSegmented { source_id: String, chunks: usize },
    ChunkSkipped { index: usize, reason: SkipReason },
    EmbeddingsGenerated { count: usize, elapsed_ms: u64 },
    ChunksStored { count: usize },
    StoreFailed { error: String },
    /// A whole document failed to store; ingestion moved on.
    DocumentFailed { source_id: String, error: String },
    /// Retrieval degraded to an empty result.
    QueryFailed { error: String },
    CandidatesFiltered { retrieved: usize, kept: usize },
    EmptyQueryRejected,
    AnswerGenerated { sources: usize, token_estimate: usize },
}

/// Receives pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn observe(&self, event: &PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn observe(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::OverlapClamped { requested, clamped } => {
                tracing::warn!(requested, clamped, "chunk overlap >= chunk size, clamped");
            }
            PipelineEvent::DocumentEmpty { source_id } => {
                tracing::warn!(source_id = %source_id, "document has no content, skipping");
            }
            PipelineEvent::SegmenterStalled {
                source_id,
                start,
                next,
            } => {
                tracing::error!(source_id = %source_id, start, next, "segmenter failed to advance, aborting document");
            }
            PipelineEvent::DocumentSegmented { source_id, chunks } => {
                tracing::debug!(source_id = %source_id, chunks, "segmented document");
            }
            PipelineEvent::ChunkSkipped { index, reason } => match reason {
                SkipReason::EmptyContent => {
                    tracing::warn!(index, "chunk has no content, skipping");
                }
                SkipReason::EmbeddingFailed(error) => {
                    tracing::warn!(index, error = %error, "embedding failed for chunk, skipping");
                }
            },
            PipelineEvent::EmbeddingsGenerated { count, elapsed_ms } => {
                tracing::info!(count, elapsed_ms, "generated embeddings");
            }
            PipelineEvent::ChunksStored { count } => {
                tracing::info!(count, "stored chunks in vector index");
            }
            PipelineEvent::StoreFailed { error } => {
                tracing::error!(error = %error, "failed to store chunks");
            }
            PipelineEvent::DocumentFailed { source_id, error } => {
                tracing::error!(source_id = %source_id, error = %error, "failed to ingest document");
            }
            PipelineEvent::QueryFailed { error } => {
                tracing::error!(error = %error, "query failed, returning no context");
            }
            PipelineEvent::CandidatesFiltered { retrieved, kept } => {
                tracing::debug!(retrieved, kept, "applied relevance filter");
            }
            PipelineEvent::EmptyQueryRejected => {
                tracing::warn!("empty query rejected");
            }
            PipelineEvent::AnswerGenerated {
                sources,
                token_estimate,
            } => {
                tracing::info!(sources, token_estimate, "answer generated");
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn observe(&self, _event: &PipelineEvent) {}
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events observed so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events for which `pred` holds.
    pub fn count(&self, pred: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl PipelineObserver for RecordingObserver {
    fn observe(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
