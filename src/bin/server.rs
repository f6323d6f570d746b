//! QA server binary
//!
//! Run with: cargo run --bin fatwa-rag-server

use std::path::Path;

use fatwa_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fatwa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Corpus: {}", config.corpus.path.display());
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Extraction model: {}", config.extraction.model);
    tracing::info!("  - Top-k: {}", config.retrieval.top_k);
    tracing::info!(
        "  - Confidence threshold: {}",
        config.extraction.confidence_threshold
    );

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API:    http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/answer - Ask a question");
    println!("  GET  /api/info   - Service info");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}

/// Resolve configuration: FATWA_RAG_CONFIG, then config/config.toml,
/// then built-in defaults
fn load_config() -> anyhow::Result<RagConfig> {
    if let Ok(path) = std::env::var("FATWA_RAG_CONFIG") {
        tracing::info!("Loading configuration from {}", path);
        return Ok(RagConfig::from_file(&path)?);
    }

    let default_path = Path::new("config/config.toml");
    if default_path.exists() {
        tracing::info!("Loading configuration from {}", default_path.display());
        return Ok(RagConfig::from_file(default_path)?);
    }

    tracing::info!("No configuration file found, using defaults");
    Ok(RagConfig::default())
}
