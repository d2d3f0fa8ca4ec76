//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the boundary to the persistent nearest
//! neighbour store. The index gateway is the only caller; it turns
//! [`Neighbor`]s into [`Candidate`](crate::models::Candidate)s.
//!
//! Distance semantics are backend-defined. Both bundled backends use
//! squared Euclidean distance, which is what the fixed relevance
//! threshold of the retriever is calibrated against.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexedChunk, Metadata};

/// One nearest-neighbour hit, as returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub content: String,
    pub metadata: Metadata,
    pub distance: f64,
}

/// Persistent nearest-neighbour store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or overwrite records by id, atomically |
/// | [`replace_source`](VectorIndex::replace_source) | Swap one source's records for a new set, atomically |
/// | [`nearest`](VectorIndex::nearest) | `k` closest records, ascending distance |
/// | [`count`](VectorIndex::count) | Number of stored records |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write all records or none. A record whose id already exists
    /// replaces the stored one.
    async fn upsert(&self, records: &[IndexedChunk]) -> Result<()>;

    /// Remove every record whose `source_id` is `source_id`, then write
    /// `records`, all or nothing. An empty `records` just removes.
    async fn replace_source(&self, source_id: &str, records: &[IndexedChunk]) -> Result<()>;

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    async fn count(&self) -> Result<usize>;
}
