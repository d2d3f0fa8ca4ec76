//! Core data models that flow through the ingestion and query pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form chunk and candidate metadata.
///
/// Values are JSON scalars so that metadata survives a round-trip through
/// any vector index backend unchanged.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the parent document's identifier.
pub const SOURCE_ID_KEY: &str = "source_id";
/// Metadata key holding the parent document's human-readable name.
pub const DISPLAY_NAME_KEY: &str = "display_name";
/// Metadata key holding the chunk's start offset (characters).
pub const CHUNK_START_KEY: &str = "chunk_start";
/// Metadata key holding the chunk's end offset (characters, exclusive).
pub const CHUNK_END_KEY: &str = "chunk_end";

/// Identity of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Unique within a corpus (the filesystem connector uses the relative path).
    pub source_id: String,
    pub display_name: String,
}

impl DocumentMetadata {
    pub fn to_metadata(&self) -> Metadata {
        let mut map = Metadata::new();
        map.insert(SOURCE_ID_KEY.to_string(), Value::from(self.source_id.clone()));
        map.insert(
            DISPLAY_NAME_KEY.to_string(),
            Value::from(self.display_name.clone()),
        );
        map
    }
}

/// A loaded source document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(
        content: impl Into<String>,
        source_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                source_id: source_id.into(),
                display_name: display_name.into(),
            },
        }
    }
}

/// A contiguous window of a document's content.
///
/// The metadata carries the parent document's metadata plus
/// `chunk_start` / `chunk_end` character offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn chunk_start(&self) -> Option<u64> {
        self.metadata.get(CHUNK_START_KEY).and_then(Value::as_u64)
    }

    pub fn chunk_end(&self) -> Option<u64> {
        self.metadata.get(CHUNK_END_KEY).and_then(Value::as_u64)
    }

    pub fn source_id(&self) -> Option<&str> {
        source_id_of(&self.metadata)
    }
}

/// A chunk paired with its embedding and stable index identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// A nearest-neighbour hit. `distance` is a dissimilarity (0 = identical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub content: String,
    pub metadata: Metadata,
    pub distance: f64,
}

/// Candidates kept by the relevance filter, ascending by distance.
pub type RetrievalResult = Vec<Candidate>;

/// Look up the source identifier, accepting `source` as an alias.
pub fn source_id_of(metadata: &Metadata) -> Option<&str> {
    metadata
        .get(SOURCE_ID_KEY)
        .or_else(|| metadata.get("source"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Stable index identifier for a chunk: `"{source_id}-{chunk_start}"`.
///
/// Returns `None` when either component is missing; callers that must
/// always have an id use [`chunk_id_or_random`].
pub fn chunk_id(metadata: &Metadata) -> Option<String> {
    let source = source_id_of(metadata)?;
    let start = metadata.get(CHUNK_START_KEY).and_then(Value::as_u64)?;
    Some(format!("{}-{}", source, start))
}

/// [`chunk_id`], falling back to a random UUID.
pub fn chunk_id_or_random(metadata: &Metadata) -> String {
    chunk_id(metadata).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
