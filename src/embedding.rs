//! Query-embedding collaborator trait and vector utilities.
//!
//! Embedding generation is external to this crate. The engine only ever
//! needs a fresh embedding for the query text itself; fragment embeddings
//! arrive through [`FragmentStore::attach_embedding`](crate::store::FragmentStore::attach_embedding).
//!
//! Failure contract: an [`EmbedError`] (or a timeout applied by the engine)
//! means "no embedding available" and triggers the keyword fallback. It is
//! never surfaced to the caller as an error. Retry policy is owned by the
//! external job layer, not by this crate.

use async_trait::async_trait;

use crate::error::EmbedError;

/// Produces a fixed-dimension vector for a text string.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    /// Embedding dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a single query text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors of
/// different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
