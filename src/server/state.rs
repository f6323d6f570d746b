//! Application state for the QA server
//!
//! Everything the pipeline needs is loaded once here and held for the
//! process lifetime. No global singletons: the state is passed into
//! every handler, and tests build a pipeline with injected fakes.

use std::sync::Arc;

use crate::config::RagConfig;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::index::EmbeddingIndex;
use crate::pipeline::QaPipeline;
use crate::providers::{OnnxEncoder, OnnxSpanExtractor, SpanExtractor, TextEncoder};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    pipeline: QaPipeline,
}

impl AppState {
    /// Load corpus, models, and embedding index; fatal on any failure
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing QA application state...");

        let corpus = Arc::new(CorpusStore::load(&config.corpus.path)?);

        let encoder: Arc<dyn TextEncoder> = Arc::new(OnnxEncoder::load(&config.embeddings).await?);
        tracing::info!("Encoder ready: {}", encoder.name());

        let extractor: Arc<dyn SpanExtractor> =
            Arc::new(OnnxSpanExtractor::load(&config.extraction).await?);
        tracing::info!("Span extractor ready: {}", extractor.name());

        let index = Arc::new(
            EmbeddingIndex::open_or_build(&config.embeddings.index_path, encoder.as_ref(), &corpus)
                .await?,
        );
        tracing::info!(
            "Embedding index ready ({} vectors, {} dims)",
            index.len(),
            index.dimensions()
        );

        let pipeline = QaPipeline::new(&config, corpus, index, encoder, extractor);

        Ok(Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        })
    }

    /// Build a state around an existing pipeline (tests)
    pub fn from_pipeline(config: RagConfig, pipeline: QaPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the QA pipeline
    pub fn pipeline(&self) -> &QaPipeline {
        &self.inner.pipeline
    }
}
