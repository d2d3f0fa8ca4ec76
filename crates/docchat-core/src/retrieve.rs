//! Relevance-filtered retrieval.

use std::sync::Arc;

use crate::gateway::IndexGateway;
use crate::models::{Candidate, RetrievalResult};
use crate::observe::{PipelineEvent, PipelineObserver};

/// Candidates farther than this are discarded.
///
/// Calibrated for squared Euclidean distance over unit-length embeddings,
/// where it corresponds to a cosine similarity of at least 0.5.
pub const RELEVANCE_THRESHOLD: f64 = 1.0;

/// Number of candidates requested per query when not configured.
pub const DEFAULT_TOP_K: usize = 3;

/// Keep candidates with `distance <= RELEVANCE_THRESHOLD`, in input order.
pub fn filter_results(candidates: Vec<Candidate>) -> RetrievalResult {
    candidates
        .into_iter()
        .filter(|c| c.distance <= RELEVANCE_THRESHOLD)
        .collect()
}

pub struct Retriever {
    gateway: Arc<IndexGateway>,
    observer: Arc<dyn PipelineObserver>,
}

impl Retriever {
    pub fn new(gateway: Arc<IndexGateway>, observer: Arc<dyn PipelineObserver>) -> Self {
        Self { gateway, observer }
    }

    /// Query the index for `k` neighbours and apply [`filter_results`].
    ///
    /// Never fails. A gateway failure shows up as an empty result.
    pub async fn retrieve(&self, query: &str, k: usize) -> RetrievalResult {
        let candidates = self.gateway.query(query, k).await;
        let retrieved = candidates.len();
        let kept = filter_results(candidates);
        self.observer.observe(&PipelineEvent::CandidatesFiltered {
            retrieved,
            kept: kept.len(),
        });
        kept
    }
}
