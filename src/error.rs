//! Error types for the fatwa QA service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus file missing, unreadable, or entirely unparseable
    #[error("Corpus load failed: {0}")]
    CorpusLoad(String),

    /// Embedding index could not be built or loaded
    #[error("Embedding index unavailable: {0}")]
    IndexUnavailable(String),

    /// Embedding or extraction model failed to load
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Question embedding failed
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Answer span extraction failed
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Malformed client request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a corpus load error
    pub fn corpus(message: impl Into<String>) -> Self {
        Self::CorpusLoad(message.into())
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a model load error
    pub fn model(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::CorpusLoad(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "corpus_error", msg.clone())
            }
            Error::IndexUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "index_unavailable", msg.clone())
            }
            Error::ModelUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", msg.clone())
            }
            Error::Encoding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encoding_error", msg.clone())
            }
            Error::Extraction(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "extraction_error", msg.clone())
            }
            Error::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
