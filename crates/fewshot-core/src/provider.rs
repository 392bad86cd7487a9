//! Embedding provider trait and the in-memory implementation.
//!
//! Embeddings are produced by an external model (ResNet, CLIP, DINOv2 —
//! opaque to this crate) and fetched by sample id. Fetches may be I/O-bound,
//! so the trait is async and object-safe for `Box<dyn EmbeddingProvider>`.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{SessionError, SessionResult};
use crate::types::{Embedding, SampleId};

/// Source of embeddings for the working collection.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fetch the embedding for one sample.
    ///
    /// Returns [`SessionError::EmbeddingUnavailable`] if the source data is
    /// unreadable or the sample is unknown.
    async fn get(&self, sample_id: &str) -> SessionResult<Embedding>;

    /// Fetch embeddings for a batch of samples.
    ///
    /// The default implementation fetches sequentially; providers with a
    /// cheaper bulk path should override it. Per-sample failures are
    /// returned in place so the caller can decide whether to skip or abort.
    async fn get_many(
        &self,
        sample_ids: &[SampleId],
    ) -> Vec<(SampleId, SessionResult<Embedding>)> {
        let mut results = Vec::with_capacity(sample_ids.len());
        for sample_id in sample_ids {
            let result = self.get(sample_id).await;
            results.push((sample_id.clone(), result));
        }
        results
    }
}

/// Provider backed by a pre-computed in-memory map.
///
/// Used by the CLI (embeddings loaded from a JSONL file) and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryEmbeddingProvider {
    embeddings: HashMap<SampleId, Embedding>,
}

impl MemoryEmbeddingProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider from an existing map.
    pub fn from_map(embeddings: HashMap<SampleId, Embedding>) -> Self {
        Self { embeddings }
    }

    /// Insert or replace the embedding for a sample.
    pub fn insert(&mut self, sample_id: impl Into<SampleId>, embedding: Embedding) {
        self.embeddings.insert(sample_id.into(), embedding);
    }

    /// All sample ids known to this provider, in sorted order.
    pub fn sample_ids(&self) -> Vec<SampleId> {
        let mut ids: Vec<SampleId> = self.embeddings.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of stored embeddings.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Whether the provider holds no embeddings.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

#[async_trait]
impl EmbeddingProvider for MemoryEmbeddingProvider {
    async fn get(&self, sample_id: &str) -> SessionResult<Embedding> {
        self.embeddings
            .get(sample_id)
            .cloned()
            .ok_or_else(|| SessionError::EmbeddingUnavailable {
                sample_id: sample_id.to_string(),
                message: "no embedding stored for sample".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_provider_get() {
        let mut provider = MemoryEmbeddingProvider::new();
        provider.insert("s1", vec![1.0, 2.0]);

        let embedding = provider.get("s1").await.unwrap();
        assert_eq!(embedding, vec![1.0, 2.0]);

        let err = provider.get("missing").await.unwrap_err();
        assert!(matches!(err, SessionError::EmbeddingUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_get_many_reports_per_sample_failures() {
        let mut provider = MemoryEmbeddingProvider::new();
        provider.insert("s1", vec![1.0]);

        let ids = vec!["s1".to_string(), "s2".to_string()];
        let results = provider.get_many(&ids).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }
}
