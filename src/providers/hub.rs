//! Hugging Face hub downloads for ONNX model files
//!
//! Files are fetched once into the configured cache directory and
//! reused across restarts.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Resolved on-disk locations of a model's files
pub struct ModelFiles {
    /// ONNX graph
    pub model: PathBuf,
    /// Serialized Hugging Face tokenizer
    pub tokenizer: PathBuf,
}

/// Ensure `model.onnx` and `tokenizer.json` for `model_id` exist in `cache_dir`
pub async fn ensure_model_files(model_id: &str, cache_dir: &Path) -> Result<ModelFiles> {
    std::fs::create_dir_all(cache_dir)
        .map_err(|e| Error::model(format!("Failed to create cache directory: {}", e)))?;

    let model = cache_dir.join("model.onnx");
    let tokenizer = cache_dir.join("tokenizer.json");

    if !model.exists() {
        let url = format!(
            "https://huggingface.co/{}/resolve/main/onnx/model.onnx",
            model_id
        );
        download_file(&url, &model).await?;
    }

    if !tokenizer.exists() {
        let url = format!(
            "https://huggingface.co/{}/resolve/main/tokenizer.json",
            model_id
        );
        download_file(&url, &tokenizer).await?;
    }

    Ok(ModelFiles { model, tokenizer })
}

async fn download_file(url: &str, path: &Path) -> Result<()> {
    tracing::info!("Downloading {}", url);

    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::model(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::model(format!(
            "Download failed: HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::model(format!("Failed to read response body: {}", e)))?;

    std::fs::write(path, &bytes)
        .map_err(|e| Error::model(format!("Failed to save {}: {}", path.display(), e)))?;

    tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());

    Ok(())
}
