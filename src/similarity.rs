//! Semantic similarity between a candidate response and its reference.
//!
//! Both strings go out in one batched embed call; the score is the cosine
//! similarity of the two vectors. An incomplete embedding response is fatal
//! for the comparison - unlike judge calls, similarity is never retried.

use std::sync::Arc;

use thiserror::Error;

use crate::gateway::{EmbedGateway, EmbedRequest, ProviderError};

#[derive(Debug, Error)]
pub enum SimilarityError {
    /// The embedding service returned fewer than two vectors.
    #[error("expected 2 embeddings, got {got}")]
    IncompleteEmbeddings { got: usize },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Embedding-backed similarity scorer. Stateless apart from its client.
#[derive(Clone)]
pub struct SimilarityClient {
    gateway: Arc<dyn EmbedGateway>,
    model: String,
}

impl SimilarityClient {
    pub fn new(gateway: Arc<dyn EmbedGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    /// Cosine similarity between candidate and reference, in [-1, 1].
    pub async fn similarity(
        &self,
        candidate: &str,
        reference: &str,
    ) -> Result<f64, SimilarityError> {
        let req = EmbedRequest::pair(&self.model, candidate, reference);
        let resp = self.gateway.embed(req).await?;

        if resp.embeddings.len() < 2 {
            return Err(SimilarityError::IncompleteEmbeddings {
                got: resp.embeddings.len(),
            });
        }

        Ok(cosine_similarity(&resp.embeddings[0], &resp.embeddings[1]))
    }
}

/// Cosine similarity of two vectors. Zero-norm input yields 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 2.0];
        let b = vec![-1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_zero_norm_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
