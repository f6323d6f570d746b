//! Core types for the question-answering pipeline

use serde::{Deserialize, Serialize};

/// A unit of retrievable text from the fatwa corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassageChunk {
    /// Document/source title
    pub title: String,
    /// Canonical source link
    pub url: String,
    /// The retrievable content (fixed-size word-chunked upstream)
    pub text: String,
}

/// A retrieved passage with its similarity to the question
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    /// The retrieved chunk
    pub chunk: PassageChunk,
    /// Cosine similarity to the question embedding (higher is better)
    pub score: f32,
}

/// Raw output of a span extractor on one (question, context) pair
#[derive(Debug, Clone, PartialEq)]
pub struct SpanCandidate {
    /// Literal substring of the context, empty when no span qualifies
    pub text: String,
    /// Model confidence in [0, 1]
    pub score: f32,
}

impl SpanCandidate {
    /// Candidate for degenerate input, never produced by a model call
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            score: 0.0,
        }
    }
}

/// Extraction result attributed to its source passage
#[derive(Debug, Clone)]
pub struct ExtractionCandidate {
    /// Extracted answer text
    pub answer: String,
    /// URL of the passage the answer was extracted from
    pub source_url: String,
    /// Extraction confidence in [0, 1]
    pub score: f32,
}

/// Request body for the answer endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    /// The question to answer
    pub question: String,
}

/// Final pipeline output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// The question as asked
    pub question: String,
    /// Extracted answer, or the fixed fallback text
    pub answer: String,
    /// Source URLs in retrieval-rank order; may contain duplicates
    /// when the same URL backs multiple passages
    pub source_urls: Vec<String>,
}
