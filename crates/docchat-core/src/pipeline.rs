//! Pipeline coordinator.
//!
//! [`Pipeline`] owns the segmenter, gateway, retriever and generator and
//! exposes the two operations the application needs:
//!
//! - [`Pipeline::ingest`]: documents → chunks → vector index.
//! - [`Pipeline::answer`]: query → retrieval → prompt → generation →
//!   citation binding.
//!
//! A reader/writer phase gate orders the two: `ingest` holds it
//! exclusively, queries share it, so a query never observes a half-ingested
//! corpus.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::citation::{bind, derive_label};
use crate::error::GenerateError;
use crate::gateway::IndexGateway;
use crate::generate::Generator;
use crate::models::{chunk_id, Candidate, Document, Metadata, RetrievalResult};
use crate::observe::{PipelineEvent, PipelineObserver};
use crate::retrieve::{Retriever, DEFAULT_TOP_K};
use crate::segment::Segmenter;

/// Response returned for a blank query.
pub const EMPTY_QUERY_RESPONSE: &str = "Please provide a valid query.";

/// Segmentation and retrieval parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chunk_size: NonZeroUsize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN),
            chunk_overlap: 200,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Result of [`Pipeline::answer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Generated text with citation markers and sources section.
    pub response: String,
    /// Metadata of the retrieved chunks, in retrieval order.
    pub sources: Vec<Metadata>,
    pub token_estimate: usize,
}

/// A document that could not be stored, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub source_id: String,
    pub error: String,
}

/// Totals from one [`Pipeline::ingest`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub documents_empty: usize,
    pub documents_stored: usize,
    pub documents_failed: usize,
    pub chunks_stored: usize,
    pub chunks_skipped: usize,
    /// One entry per failed document, in ingestion order.
    pub failures: Vec<DocumentFailure>,
}

pub struct Pipeline {
    segmenter: Segmenter,
    gateway: Arc<IndexGateway>,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    top_k: usize,
    observer: Arc<dyn PipelineObserver>,
    phase: RwLock<()>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        gateway: Arc<IndexGateway>,
        generator: Arc<dyn Generator>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            segmenter: Segmenter::new(config.chunk_size, config.chunk_overlap, observer.clone()),
            retriever: Retriever::new(gateway.clone(), observer.clone()),
            gateway,
            generator,
            top_k: config.top_k,
            observer,
            phase: RwLock::new(()),
        }
    }

    /// Segment and store each document.
    ///
    /// Documents are stored one at a time, each replacing whatever was
    /// stored for its `source_id` before. A document that is now empty has
    /// its old chunks removed. A document that fails to store (including on
    /// timeout) keeps its previous chunks and is counted and reported; the
    /// rest continue.
    pub async fn ingest(&self, documents: &[Document]) -> IngestReport {
        let _phase = self.phase.write().await;
        let mut report = IngestReport::default();

        for document in documents {
            report.documents += 1;
            let chunks = self.segmenter.chunk(document);
            let source_id = document.metadata.source_id.as_str();
            if chunks.is_empty() {
                report.documents_empty += 1;
                if let Err(e) = self.gateway.remove_source(source_id).await {
                    self.observer.observe(&PipelineEvent::DocumentFailed {
                        source_id: source_id.to_string(),
                        error: e.to_string(),
                    });
                }
                continue;
            }

            match self.gateway.replace_source(source_id, &chunks).await {
                Ok(stored) => {
                    report.documents_stored += 1;
                    report.chunks_stored += stored.stored;
                    report.chunks_skipped += stored.skipped_empty + stored.failed_embedding;
                }
                Err(e) => {
                    report.documents_failed += 1;
                    report.chunks_skipped += chunks.len();
                    self.observer.observe(&PipelineEvent::DocumentFailed {
                        source_id: source_id.to_string(),
                        error: e.to_string(),
                    });
                    report.failures.push(DocumentFailure {
                        source_id: source_id.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Relevance-filtered neighbours of `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> RetrievalResult {
        let _phase = self.phase.read().await;
        self.retriever.retrieve(query, k).await
    }

    /// Answer `query` from the indexed corpus.
    ///
    /// A blank query short-circuits to [`EMPTY_QUERY_RESPONSE`] without
    /// touching the index or the generator.
    ///
    /// # Errors
    ///
    /// Whatever the generator returns, unchanged.
    pub async fn answer(&self, query: &str) -> Result<Answer, GenerateError> {
        let _phase = self.phase.read().await;

        let query = query.trim();
        if query.is_empty() {
            self.observer.observe(&PipelineEvent::EmptyQueryRejected);
            return Ok(Answer {
                response: EMPTY_QUERY_RESPONSE.to_string(),
                sources: Vec::new(),
                token_estimate: 0,
            });
        }

        let results = self.retriever.retrieve(query, self.top_k).await;
        let prompt = build_prompt(query, &results);
        let raw_answer = self.generator.generate(&prompt).await?;
        let annotated = bind(&raw_answer, &results);
        let tokens = token_estimate(&prompt, &raw_answer);

        self.observer.observe(&PipelineEvent::AnswerGenerated {
            sources: results.len(),
            token_estimate: tokens,
        });

        Ok(Answer {
            response: annotated.text,
            sources: results.into_iter().map(|c| c.metadata).collect(),
            token_estimate: tokens,
        })
    }
}

/// Assemble the generation prompt.
///
/// One `Source: <id>\nContent: <text>` block per candidate, blank-line
/// separated, then `Question: <query>`. `<id>` is the chunk id when the
/// metadata allows one, otherwise the source label.
pub fn build_prompt(query: &str, context: &[Candidate]) -> String {
    let mut prompt = String::new();
    for candidate in context {
        let id = chunk_id(&candidate.metadata).unwrap_or_else(|| derive_label(&candidate.metadata));
        prompt.push_str(&format!("Source: {}\nContent: {}\n\n", id, candidate.content));
    }
    prompt.push_str(&format!("Question: {}", query));
    prompt
}

/// Rough token count: whitespace-separated words in prompt and answer.
///
/// This is not a tokenizer count. Real tokenizers usually produce more
/// tokens than words, so treat the value as a lower bound.
pub fn token_estimate(prompt: &str, raw_answer: &str) -> usize {
    prompt.split_whitespace().count() + raw_answer.split_whitespace().count()
}
