//! fatwa-rag: retrieval-augmented extractive question answering over a
//! fatwa corpus
//!
//! A question is embedded with a multilingual sentence-transformer,
//! the most similar passage chunks are retrieved by cosine similarity,
//! an extractive QA model selects an answer span per passage, and a
//! confidence-thresholded aggregation policy picks the final answer
//! with source attributions.

pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use corpus::CorpusStore;
pub use error::{Error, Result};
pub use index::EmbeddingIndex;
pub use pipeline::QaPipeline;
pub use types::{AnswerRequest, AnswerResponse, PassageChunk, RetrievedPassage, SpanCandidate};
