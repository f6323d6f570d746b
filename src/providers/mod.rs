//! Model capability traits for the QA pipeline
//!
//! The pipeline only ever talks to these two narrow interfaces, so
//! alternative backends (and deterministic test fakes) can be swapped
//! in without touching retrieval or aggregation logic.

pub mod hub;
pub mod onnx_encoder;
pub mod onnx_extractor;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SpanCandidate;

pub use onnx_encoder::OnnxEncoder;
pub use onnx_extractor::OnnxSpanExtractor;

/// Trait for sentence embedding
///
/// Implementations:
/// - `OnnxEncoder`: local ONNX multilingual sentence-transformer
#[async_trait]
pub trait TextEncoder: Send + Sync {
    /// Embed a single text
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts (batch)
    ///
    /// Default implementation calls `encode` sequentially.
    /// Implementations should override for better performance.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.encode(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions (384 for multilingual MiniLM)
    fn dimensions(&self) -> usize;

    /// Model identity, recorded in the embedding cache for validation
    fn name(&self) -> &str;
}

/// Trait for extractive answer-span selection
///
/// Implementations:
/// - `OnnxSpanExtractor`: local ONNX SQuAD-style QA head
#[async_trait]
pub trait SpanExtractor: Send + Sync {
    /// Select the most likely answer substring of `context` for `question`
    ///
    /// Must return an empty, zero-score candidate for whitespace-only
    /// context instead of invoking the model.
    async fn extract(&self, question: &str, context: &str) -> Result<SpanCandidate>;

    /// Model identity for logging
    fn name(&self) -> &str;
}
