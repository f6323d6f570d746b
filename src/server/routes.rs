//! API routes for the QA server

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{AnswerRequest, AnswerResponse};

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/answer", post(answer_question))
        .route("/info", get(info))
}

/// POST /api/answer - Answer a question over the fatwa corpus
pub async fn answer_question(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(Error::InvalidRequest("question must not be empty".into()));
    }

    let start = Instant::now();
    tracing::info!("Question: \"{}\"", question);

    let response = state.pipeline().answer(question).await?;

    tracing::info!(
        "Answered in {}ms with {} sources",
        start.elapsed().as_millis(),
        response.source_urls.len()
    );

    Ok(Json(response))
}

/// GET /api/info - Service and model identity
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "fatwa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented extractive QA over a fatwa corpus",
        "corpus_chunks": state.pipeline().corpus_size(),
        "embedding_model": state.pipeline().encoder_name(),
        "extraction_model": state.pipeline().extractor_name(),
        "top_k": state.config().retrieval.top_k,
        "confidence_threshold": state.config().extraction.confidence_threshold,
        "endpoints": {
            "POST /api/answer": "Answer a question with source attributions",
            "GET /api/info": "Service and model identity",
            "GET /health": "Liveness check"
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::corpus::CorpusStore;
    use crate::index::EmbeddingIndex;
    use crate::pipeline::QaPipeline;
    use crate::providers::{SpanExtractor, TextEncoder};
    use crate::types::{PassageChunk, SpanCandidate};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct ConstEncoder;

    #[async_trait]
    impl TextEncoder for ConstEncoder {
        async fn encode(&self, _text: &str) -> crate::error::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "const-encoder"
        }
    }

    struct ConstExtractor;

    #[async_trait]
    impl SpanExtractor for ConstExtractor {
        async fn extract(
            &self,
            _question: &str,
            _context: &str,
        ) -> crate::error::Result<SpanCandidate> {
            Ok(SpanCandidate {
                text: "the answer".to_string(),
                score: 0.8,
            })
        }

        fn name(&self) -> &str {
            "const-extractor"
        }
    }

    async fn test_state() -> AppState {
        let config = RagConfig::default();
        let corpus = Arc::new(CorpusStore::from_chunks(vec![PassageChunk {
            title: "T1".into(),
            url: "u1".into(),
            text: "some passage".into(),
        }]));
        let encoder: Arc<dyn TextEncoder> = Arc::new(ConstEncoder);
        let index = Arc::new(
            EmbeddingIndex::build(encoder.as_ref(), &corpus)
                .await
                .unwrap(),
        );
        let pipeline = QaPipeline::new(
            &config,
            corpus,
            index,
            encoder,
            Arc::new(ConstExtractor),
        );
        AppState::from_pipeline(config, pipeline)
    }

    #[tokio::test]
    async fn answer_route_returns_structured_response() {
        let state = test_state().await;
        let request = AnswerRequest {
            question: "Is riba allowed?".to_string(),
        };

        let Json(response) = answer_question(State(state), Json(request)).await.unwrap();
        assert_eq!(response.question, "Is riba allowed?");
        assert_eq!(response.answer, "the answer");
        assert_eq!(response.source_urls, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let state = test_state().await;
        let request = AnswerRequest {
            question: "   ".to_string(),
        };

        let err = answer_question(State(state), Json(request))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
