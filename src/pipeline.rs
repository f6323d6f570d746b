//! Question-answering pipeline: retrieve, extract, aggregate
//!
//! One synchronous call chain per question. All state the pipeline
//! holds (corpus, index, models) is read-only after startup, so
//! concurrent requests share it without locking.

use std::sync::Arc;

use crate::config::RagConfig;
use crate::corpus::CorpusStore;
use crate::error::{Error, Result};
use crate::index::EmbeddingIndex;
use crate::providers::{SpanExtractor, TextEncoder};
use crate::types::{AnswerResponse, ExtractionCandidate, RetrievedPassage};

/// The retrieval + extraction pipeline
pub struct QaPipeline {
    corpus: Arc<CorpusStore>,
    index: Arc<EmbeddingIndex>,
    encoder: Arc<dyn TextEncoder>,
    extractor: Arc<dyn SpanExtractor>,
    top_k: usize,
    confidence_threshold: f32,
    fallback_answer: String,
}

impl QaPipeline {
    /// Assemble a pipeline from already-initialized components
    pub fn new(
        config: &RagConfig,
        corpus: Arc<CorpusStore>,
        index: Arc<EmbeddingIndex>,
        encoder: Arc<dyn TextEncoder>,
        extractor: Arc<dyn SpanExtractor>,
    ) -> Self {
        Self {
            corpus,
            index,
            encoder,
            extractor,
            top_k: config.retrieval.top_k,
            confidence_threshold: config.extraction.confidence_threshold,
            fallback_answer: config.extraction.fallback_answer.clone(),
        }
    }

    /// Top-k passages by cosine similarity to the question
    ///
    /// Returns fewer than k results when the corpus is smaller than k.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        let query = self.encoder.encode(question).await?;
        let neighbors = self.index.nearest(&query, k.max(1));

        let mut passages = Vec::with_capacity(neighbors.len());
        for (idx, score) in neighbors {
            let chunk = self.corpus.get(idx).ok_or_else(|| {
                Error::IndexUnavailable(format!(
                    "Index position {} has no corpus chunk (index/corpus misaligned)",
                    idx
                ))
            })?;
            passages.push(RetrievedPassage {
                chunk: chunk.clone(),
                score,
            });
        }

        Ok(passages)
    }

    /// Answer a question: the pipeline's single entry point
    pub async fn answer(&self, question: &str) -> Result<AnswerResponse> {
        let retrieved = self.retrieve(question, self.top_k).await?;

        let mut candidates = Vec::with_capacity(retrieved.len());
        for passage in &retrieved {
            let candidate = self.extract_candidate(question, passage).await;
            tracing::debug!(
                title = %passage.chunk.title,
                score = candidate.score,
                answer = %candidate.answer,
                "Extraction candidate"
            );
            candidates.push(candidate);
        }

        let (answer, source_urls) = aggregate(
            candidates,
            &retrieved,
            self.confidence_threshold,
            &self.fallback_answer,
        );

        Ok(AnswerResponse {
            question: question.to_string(),
            answer,
            source_urls,
        })
    }

    /// Run the extractor on one passage
    ///
    /// Degenerate passages never reach the model, and a failed model
    /// call is a zero-score candidate rather than a request error.
    async fn extract_candidate(
        &self,
        question: &str,
        passage: &RetrievedPassage,
    ) -> ExtractionCandidate {
        let url = passage.chunk.url.clone();

        if passage.chunk.text.trim().is_empty() {
            return ExtractionCandidate {
                answer: String::new(),
                source_url: url,
                score: 0.0,
            };
        }

        match self.extractor.extract(question, &passage.chunk.text).await {
            Ok(span) => ExtractionCandidate {
                answer: span.text,
                source_url: url,
                score: span.score,
            },
            Err(e) => {
                tracing::warn!(
                    "Extraction failed on passage '{}': {}",
                    passage.chunk.title,
                    e
                );
                ExtractionCandidate {
                    answer: String::new(),
                    source_url: url,
                    score: 0.0,
                }
            }
        }
    }

    /// Number of chunks in the loaded corpus
    pub fn corpus_size(&self) -> usize {
        self.corpus.len()
    }

    /// Embedding model identity
    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    /// Extraction model identity
    pub fn extractor_name(&self) -> &str {
        self.extractor.name()
    }
}

/// Confidence-thresholded aggregation over extraction candidates
///
/// Survivors are candidates with a non-empty answer scoring strictly
/// above the threshold. The first survivor in retrieval-rank order
/// supplies the answer text; all survivors contribute their source
/// URLs in order. With no survivor the fixed fallback answer is
/// returned, attributed to every retrieved passage.
fn aggregate(
    candidates: Vec<ExtractionCandidate>,
    retrieved: &[RetrievedPassage],
    threshold: f32,
    fallback: &str,
) -> (String, Vec<String>) {
    let survivors: Vec<&ExtractionCandidate> = candidates
        .iter()
        .filter(|c| !c.answer.trim().is_empty() && c.score > threshold)
        .collect();

    if let Some(first) = survivors.first() {
        let sources = survivors.iter().map(|c| c.source_url.clone()).collect();
        (first.answer.clone(), sources)
    } else {
        let sources = retrieved.iter().map(|p| p.chunk.url.clone()).collect();
        (fallback.to_string(), sources)
    }
}
