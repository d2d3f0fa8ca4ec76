//! Embedder trait and vector utilities.
//!
//! Concrete embedders (OpenAI, Ollama, fastembed) live in the `docchat`
//! app crate.

use async_trait::async_trait;

use crate::error::EmbedError;

/// Turns text into a fixed-length vector.
///
/// Implementations must be deterministic for identical input within a
/// session. The default [`embed_batch`](Embedder::embed_batch) calls
/// [`embed`](Embedder::embed) sequentially; backends with a native batch
/// endpoint should override it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding dimensionality (e.g. `384`).
    fn dims(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Squared Euclidean distance between two vectors.
///
/// For unit-length embeddings this is `2 - 2·cos(θ)`, so it lies in
/// `[0, 4]`. Returns `f64::INFINITY` for vectors of different lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum()
}

/// Encode a float vector as little-endian `f32` bytes.
///
/// ```rust
/// use docchat_core::embedding::{blob_to_vec, vec_to_blob};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode bytes produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2_identical_is_zero() {
        let v = vec![0.6, 0.8];
        assert_eq!(squared_l2(&v, &v), 0.0);
    }

    #[test]
    fn test_squared_l2_unit_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((squared_l2(&a, &b) - 2.0).abs() < 1e-9);
        let c = vec![-1.0, 0.0];
        assert!((squared_l2(&a, &c) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_squared_l2_length_mismatch() {
        assert!(squared_l2(&[1.0, 2.0], &[1.0]).is_infinite());
    }

    #[test]
    fn test_blob_decode_ignores_trailing_bytes() {
        let mut blob = vec_to_blob(&[1.5, -0.25]);
        blob.push(7);
        assert_eq!(blob_to_vec(&blob), vec![1.5, -0.25]);
    }
}
