//! Embedding index over the corpus
//!
//! One dense vector per passage chunk, aligned by positional index.
//! The index is built once at startup by encoding every chunk, or
//! restored from a persisted cache when the cache still matches the
//! live corpus and embedding model. Nearest-neighbor lookup is a
//! brute-force cosine scan; the corpus is small and fully in memory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusStore;
use crate::error::{Error, Result};
use crate::providers::TextEncoder;

/// Persisted cache format
#[derive(Serialize, Deserialize)]
struct IndexFile {
    model: String,
    dimensions: usize,
    corpus_fingerprint: String,
    vectors: Vec<Vec<f32>>,
}

/// Ordered sequence of chunk embeddings plus the identity that produced them
pub struct EmbeddingIndex {
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
    model: String,
    corpus_fingerprint: String,
}

impl EmbeddingIndex {
    /// Encode every chunk of the corpus
    pub async fn build(encoder: &dyn TextEncoder, corpus: &CorpusStore) -> Result<Self> {
        tracing::info!(
            "Building embedding index for {} chunks with {}",
            corpus.len(),
            encoder.name()
        );

        let texts: Vec<String> = corpus.chunks().iter().map(|c| c.text.clone()).collect();
        let vectors = encoder.encode_batch(&texts).await.map_err(|e| {
            Error::IndexUnavailable(format!("Corpus encoding failed: {}", e))
        })?;

        if vectors.len() != corpus.len() {
            return Err(Error::IndexUnavailable(format!(
                "Encoder returned {} vectors for {} chunks",
                vectors.len(),
                corpus.len()
            )));
        }

        Ok(Self {
            vectors,
            dimensions: encoder.dimensions(),
            model: encoder.name().to_string(),
            corpus_fingerprint: corpus.fingerprint().to_string(),
        })
    }

    /// Load the persisted cache, if present
    ///
    /// A missing file is `None`; an unreadable or corrupt cache is
    /// logged and also `None`, so the caller rebuilds instead of
    /// failing startup.
    pub fn load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read embedding cache {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<IndexFile>(&content) {
            Ok(file) => Some(Self {
                vectors: file.vectors,
                dimensions: file.dimensions,
                model: file.model,
                corpus_fingerprint: file.corpus_fingerprint,
            }),
            Err(e) => {
                tracing::warn!("Corrupt embedding cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persist the index; a write failure is logged, not fatal
    pub fn save(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create {}: {}", parent.display(), e);
                return;
            }
        }

        let file = IndexFile {
            model: self.model.clone(),
            dimensions: self.dimensions,
            corpus_fingerprint: self.corpus_fingerprint.clone(),
            vectors: self.vectors.clone(),
        };

        match serde_json::to_string(&file) {
            Ok(content) => {
                if let Err(e) = std::fs::write(path, content) {
                    tracing::warn!("Failed to write embedding cache {}: {}", path.display(), e);
                } else {
                    tracing::info!("Persisted embedding cache to {}", path.display());
                }
            }
            Err(e) => tracing::warn!("Failed to serialize embedding cache: {}", e),
        }
    }

    /// Load the cache when it matches the corpus and model, otherwise rebuild
    pub async fn open_or_build(
        path: impl AsRef<Path>,
        encoder: &dyn TextEncoder,
        corpus: &CorpusStore,
    ) -> Result<Self> {
        let path = path.as_ref();

        if let Some(cached) = Self::load(path) {
            if cached.matches(encoder.name(), corpus.fingerprint()) {
                tracing::info!(
                    "Loaded embedding cache from {} ({} vectors)",
                    path.display(),
                    cached.len()
                );
                return Ok(cached);
            }
            tracing::warn!(
                "Embedding cache {} is stale (model or corpus changed), rebuilding",
                path.display()
            );
        }

        let index = Self::build(encoder, corpus).await?;
        index.save(path);
        Ok(index)
    }

    /// Whether this index was produced by `model` over the corpus with
    /// the given fingerprint
    pub fn matches(&self, model: &str, corpus_fingerprint: &str) -> bool {
        self.model == model && self.corpus_fingerprint == corpus_fingerprint
    }

    /// Top-k positional indices by cosine similarity, descending
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Model that produced the vectors
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PassageChunk;
    use async_trait::async_trait;

    /// Encoder mapping each text to a fixed unit vector by first byte
    struct FakeEncoder;

    #[async_trait]
    impl TextEncoder for FakeEncoder {
        async fn encode(&self, text: &str) -> crate::error::Result<Vec<f32>> {
            let angle = text.bytes().next().unwrap_or(0) as f32 / 10.0;
            Ok(vec![angle.cos(), angle.sin()])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "fake-encoder"
        }
    }

    fn corpus(texts: &[&str]) -> CorpusStore {
        CorpusStore::from_chunks(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| PassageChunk {
                    title: format!("T{}", i),
                    url: format!("u{}", i),
                    text: t.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn nearest_is_sorted_descending() {
        let store = corpus(&["a", "b", "c", "d"]);
        let index = EmbeddingIndex::build(&FakeEncoder, &store).await.unwrap();

        let query = FakeEncoder.encode("a").await.unwrap();
        let results = index.nearest(&query, 3);

        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(results[0].0, 0);
    }

    #[tokio::test]
    async fn nearest_clamps_k_to_corpus_size() {
        let store = corpus(&["only"]);
        let index = EmbeddingIndex::build(&FakeEncoder, &store).await.unwrap();

        let query = FakeEncoder.encode("anything").await.unwrap();
        assert_eq!(index.nearest(&query, 3).len(), 1);
    }

    #[tokio::test]
    async fn cache_round_trip_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let store = corpus(&["a", "b"]);
        let index = EmbeddingIndex::build(&FakeEncoder, &store).await.unwrap();
        index.save(&path);

        let loaded = EmbeddingIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.matches("fake-encoder", store.fingerprint()));
        assert!(!loaded.matches("fake-encoder", "different-fingerprint"));
        assert!(!loaded.matches("other-model", store.fingerprint()));
    }

    #[tokio::test]
    async fn open_or_build_rebuilds_on_corpus_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let store = corpus(&["a", "b"]);
        EmbeddingIndex::open_or_build(&path, &FakeEncoder, &store)
            .await
            .unwrap();

        // Same path, different corpus: the stale cache must not be reused
        let changed = corpus(&["a", "b", "c"]);
        let rebuilt = EmbeddingIndex::open_or_build(&path, &FakeEncoder, &changed)
            .await
            .unwrap();

        assert_eq!(rebuilt.len(), 3);
        assert!(rebuilt.matches("fake-encoder", changed.fingerprint()));
    }

    #[test]
    fn load_missing_cache_is_none() {
        assert!(EmbeddingIndex::load("/nonexistent/cache.json").is_none());
    }

    #[test]
    fn load_corrupt_cache_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(EmbeddingIndex::load(&path).is_none());
    }
}
