//! Index gateway: the single path between chunks and the vector index.
//!
//! [`IndexGateway::store`] embeds chunks and writes them in one atomic
//! upsert. [`IndexGateway::query`] embeds a query string and returns the
//! nearest stored chunks as [`Candidate`]s.
//!
//! # Store flow
//!
//! ```text
//! chunks ─▶ drop empty ─▶ embed_batch (batch_size) ─▶ validate dims ─▶ upsert
//!                              │ batch error
//!                              ▼
//!                         embed each text, drop only the failures
//! ```
//!
//! Embedding time for the whole call is measured once the embedder has
//! returned. If it exceeds the ceiling the call fails with
//! [`IndexError::Timeout`] and nothing is written.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::embedding::Embedder;
use crate::error::{EmbedError, IndexError};
use crate::models::{chunk_id_or_random, Candidate, Chunk, IndexedChunk};
use crate::observe::{PipelineEvent, PipelineObserver, SkipReason};
use crate::store::VectorIndex;

/// Default number of texts per embedder call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default ceiling on embedding time for a single `store` call.
pub const DEFAULT_GENERATION_CEILING: Duration = Duration::from_secs(60);

/// Per-call counts from a successful [`IndexGateway::store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    pub stored: usize,
    pub skipped_empty: usize,
    pub failed_embedding: usize,
}

pub struct IndexGateway {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
    ceiling: Duration,
    observer: Arc<dyn PipelineObserver>,
}

impl IndexGateway {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            embedder,
            index,
            batch_size: DEFAULT_BATCH_SIZE,
            ceiling: DEFAULT_GENERATION_CEILING,
            observer,
        }
    }

    /// Texts per embedder call. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Embed and persist `chunks`.
    ///
    /// Empty chunks and chunks whose embedding fails are dropped with a
    /// [`PipelineEvent::ChunkSkipped`] event. The rest are written with a
    /// single upsert keyed by `"{source_id}-{chunk_start}"`, so storing the
    /// same chunk again overwrites it.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NoValidChunks`] if every chunk is empty.
    /// - [`IndexError::Embedding`] if every non-empty chunk failed to embed.
    /// - [`IndexError::Timeout`] if embedding exceeded the ceiling.
    /// - [`IndexError::Store`] if the index rejected the write.
    pub async fn store(&self, chunks: &[Chunk]) -> Result<StoreReport, IndexError> {
        self.write(chunks, None).await
    }

    /// Like [`store`](Self::store), but every chunk previously stored for
    /// `source_id` is removed in the same write. Used when re-ingesting a
    /// document so chunks past its new end do not linger. Nothing is removed
    /// when the call fails.
    pub async fn replace_source(
        &self,
        source_id: &str,
        chunks: &[Chunk],
    ) -> Result<StoreReport, IndexError> {
        self.write(chunks, Some(source_id)).await
    }

    /// Drop every stored chunk of `source_id`.
    pub async fn remove_source(&self, source_id: &str) -> Result<(), IndexError> {
        self.index
            .replace_source(source_id, &[])
            .await
            .map_err(|e| self.fail(IndexError::Store(format!("{:#}", e))))
    }

    async fn write(
        &self,
        chunks: &[Chunk],
        replace: Option<&str>,
    ) -> Result<StoreReport, IndexError> {
        let mut report = StoreReport::default();

        let mut pending: Vec<(usize, &Chunk)> = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            if chunk.content.trim().is_empty() {
                self.observer.observe(&PipelineEvent::ChunkSkipped {
                    index,
                    reason: SkipReason::EmptyContent,
                });
                report.skipped_empty += 1;
            } else {
                pending.push((index, chunk));
            }
        }

        if pending.is_empty() {
            return Err(self.fail(IndexError::NoValidChunks));
        }

        let started = Instant::now();
        let mut records = Vec::with_capacity(pending.len());
        let mut last_error: Option<EmbedError> = None;

        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|(_, c)| c.content.clone()).collect();
            let vectors = self.embed_batch_or_each(&texts).await;

            for ((index, chunk), vector) in batch.iter().zip(vectors) {
                match vector {
                    Ok(embedding) => records.push(IndexedChunk {
                        id: chunk_id_or_random(&chunk.metadata),
                        content: chunk.content.clone(),
                        metadata: chunk.metadata.clone(),
                        embedding,
                    }),
                    Err(e) => {
                        self.observer.observe(&PipelineEvent::ChunkSkipped {
                            index: *index,
                            reason: SkipReason::EmbeddingFailed(e.0.clone()),
                        });
                        report.failed_embedding += 1;
                        last_error = Some(e);
                    }
                }
            }
        }

        let elapsed = started.elapsed();
        self.observer.observe(&PipelineEvent::EmbeddingsGenerated {
            count: records.len(),
            elapsed_ms: elapsed.as_millis() as u64,
        });

        if elapsed > self.ceiling {
            return Err(self.fail(IndexError::Timeout {
                elapsed,
                ceiling: self.ceiling,
            }));
        }

        // Every non-empty chunk failed: the backend is down, not the input.
        if records.is_empty() {
            let error = match last_error {
                Some(e) => IndexError::Embedding(e.0),
                None => IndexError::NoValidChunks,
            };
            return Err(self.fail(error));
        }

        let written = match replace {
            Some(source_id) => self.index.replace_source(source_id, &records).await,
            None => self.index.upsert(&records).await,
        };
        written.map_err(|e| self.fail(IndexError::Store(format!("{:#}", e))))?;

        report.stored = records.len();
        self.observer.observe(&PipelineEvent::ChunksStored {
            count: report.stored,
        });
        Ok(report)
    }

    /// Nearest stored chunks to `text`, ascending by distance.
    ///
    /// Never fails: an embedder or index error yields an empty result and
    /// a [`PipelineEvent::QueryFailed`] event.
    pub async fn query(&self, text: &str, k: usize) -> Vec<Candidate> {
        match self.try_query(text, k).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.observer.observe(&PipelineEvent::QueryFailed {
                    error: format!("{:#}", e),
                });
                Vec::new()
            }
        }
    }

    async fn try_query(&self, text: &str, k: usize) -> anyhow::Result<Vec<Candidate>> {
        let vector = self.embedder.embed(text).await?;
        let vector = self.validate(vector)?;
        let hits = self.index.nearest(&vector, k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| Candidate {
                content: hit.content,
                metadata: hit.metadata,
                distance: hit.distance,
            })
            .collect())
    }

    /// One result per input text, in order.
    async fn embed_batch_or_each(&self, texts: &[String]) -> Vec<Result<Vec<f32>, EmbedError>> {
        match self.embedder.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                return vectors.into_iter().map(|v| self.validate(v)).collect();
            }
            Ok(vectors) => {
                tracing::debug!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "batch returned wrong number of vectors, retrying individually"
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "batch embedding failed, retrying individually");
            }
        }

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let result = match self.embedder.embed(text).await {
                Ok(v) => self.validate(v),
                Err(e) => Err(e),
            };
            out.push(result);
        }
        out
    }

    fn validate(&self, vector: Vec<f32>) -> Result<Vec<f32>, EmbedError> {
        let dims = self.embedder.dims();
        if vector.is_empty() {
            return Err(EmbedError("embedder returned an empty vector".to_string()));
        }
        if dims > 0 && vector.len() != dims {
            return Err(EmbedError(format!(
                "expected {} dimensions, got {}",
                dims,
                vector.len()
            )));
        }
        Ok(vector)
    }

    fn fail(&self, error: IndexError) -> IndexError {
        self.observer.observe(&PipelineEvent::StoreFailed {
            error: error.to_string(),
        });
        error
    }
}
