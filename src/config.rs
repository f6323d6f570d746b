//! Configuration for the fatwa QA service

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Corpus configuration
    #[serde(default)]
    pub corpus: CorpusConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable permissive CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

/// Corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the JSONL corpus file (one chunk record per line)
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/processed/fatwas_cleaned.jsonl"),
        }
    }
}

/// Sentence-embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Hugging Face model id
    pub model: String,
    /// Embedding dimensions (384 for multilingual MiniLM)
    pub dimensions: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Batch size for corpus encoding
    pub batch_size: usize,
    /// Cache directory for downloaded model files
    pub cache_dir: PathBuf,
    /// Path of the persisted embedding index
    pub index_path: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            dimensions: 384,
            max_length: 256,
            batch_size: 32,
            cache_dir: default_cache_dir().join("encoder"),
            index_path: PathBuf::from("data/processed/fatwa_embeddings.json"),
        }
    }
}

/// Extractive QA model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Hugging Face model id
    pub model: String,
    /// Maximum sequence length for the (question, context) pair
    pub max_length: usize,
    /// Maximum answer span length in tokens
    pub max_answer_tokens: usize,
    /// Confidence threshold for accepting an extracted span
    pub confidence_threshold: f32,
    /// Cache directory for downloaded model files
    pub cache_dir: PathBuf,
    /// Fixed answer returned when no candidate clears the threshold
    pub fallback_answer: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: "ZeyadAhmed/AraElectra-Arabic-SQuADv2-QA".to_string(),
            max_length: 384,
            max_answer_tokens: 48,
            confidence_threshold: 0.2,
            cache_dir: default_cache_dir().join("extractor"),
            fallback_answer: "لم أجد إجابة واضحة على سؤالك في الوقت الحالي.".to_string(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages to retrieve per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fatwa-rag")
        .join("models")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_contract() {
        let config = RagConfig::default();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.embeddings.dimensions, 384);
        assert!((config.extraction.confidence_threshold - 0.2).abs() < f32::EPSILON);
        assert!(!config.extraction.fallback_answer.is_empty());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            enable_cors = false

            [retrieval]
            top_k = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(
            config.embeddings.model,
            "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
        );
    }
}
