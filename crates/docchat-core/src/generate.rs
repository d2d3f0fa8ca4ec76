//! Text generation seam.
//!
//! The core only needs "prompt in, text out". Model loading, backend
//! selection, and sampling parameters belong to the implementation.

use async_trait::async_trait;

use crate::error::GenerateError;

/// Produces a completion for a fully assembled prompt.
///
/// Implementations return [`GenerateError::NotReady`] when called before
/// their model is available, and [`GenerateError::Backend`] for failures of
/// a ready model. Callers do not retry.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}
