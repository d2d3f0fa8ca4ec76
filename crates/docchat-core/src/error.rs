//! Error types for the docchat core.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by an [`Embedder`](crate::embedding::Embedder).
#[derive(Debug, Clone, Error)]
#[error("embedding failed: {0}")]
pub struct EmbedError(pub String);

/// Whole-call failures of the index gateway's `store`.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Every chunk was empty; nothing was written.
    #[error("no valid chunks to store")]
    NoValidChunks,

    /// Embedding generation ran longer than the configured ceiling.
    ///
    /// Detected after the embedder returns, so the work itself was not
    /// cancelled. Nothing was written.
    #[error("embedding generation took {elapsed:?}, exceeding the {ceiling:?} ceiling")]
    Timeout { elapsed: Duration, ceiling: Duration },

    /// Every non-empty chunk failed to embed. Carries the last embedder error.
    #[error("embedding backend error: {0}")]
    Embedding(String),

    /// The vector index rejected the write.
    #[error("vector index error: {0}")]
    Store(String),
}

impl IndexError {
    /// True for the "too slow" condition, as opposed to "broken".
    pub fn is_timeout(&self) -> bool {
        matches!(self, IndexError::Timeout { .. })
    }
}

/// Failures of a [`Generator`](crate::generate::Generator).
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    /// The model has not been loaded yet.
    #[error("model not ready: {0}")]
    NotReady(String),

    /// The model is loaded but the call failed.
    #[error("generation failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinct_from_backend_errors() {
        let timeout = IndexError::Timeout {
            elapsed: Duration::from_secs(61),
            ceiling: Duration::from_secs(60),
        };
        assert!(timeout.is_timeout());
        assert!(!IndexError::Store("disk full".into()).is_timeout());
        assert!(!IndexError::Embedding("down".into()).is_timeout());
        assert!(timeout.to_string().contains("ceiling"));
    }
}
