//! Corpus store: the static collection of fatwa passage chunks
//!
//! Loaded once at startup from a JSONL file and immutable afterwards.
//! File order defines the positional index used to align chunks with
//! their embedding vectors.

use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::PassageChunk;

/// One line of the corpus file
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    title: String,
    url: String,
    chunk: String,
}

/// Immutable, in-memory collection of passage chunks
#[derive(Debug)]
pub struct CorpusStore {
    chunks: Vec<PassageChunk>,
    fingerprint: String,
}

impl CorpusStore {
    /// Load the corpus from a JSONL file
    ///
    /// Malformed lines are skipped with a warning; a missing file or a
    /// file with no valid record at all is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::corpus(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let fingerprint = hex::encode(Sha256::digest(content.as_bytes()));

        let mut chunks = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CorpusRecord>(line) {
                Ok(record) => chunks.push(PassageChunk {
                    title: record.title,
                    url: record.url,
                    text: record.chunk,
                }),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(
                        "Skipping malformed corpus line {} in {}: {}",
                        line_no + 1,
                        path.display(),
                        e
                    );
                }
            }
        }

        if chunks.is_empty() {
            return Err(Error::corpus(format!(
                "No valid chunk records in {} ({} malformed lines)",
                path.display(),
                skipped
            )));
        }

        tracing::info!(
            "Loaded {} passage chunks from {} ({} skipped)",
            chunks.len(),
            path.display(),
            skipped
        );

        Ok(Self {
            chunks,
            fingerprint,
        })
    }

    /// Chunk at a positional index
    pub fn get(&self, index: usize) -> Option<&PassageChunk> {
        self.chunks.get(index)
    }

    /// All chunks in file order
    pub fn chunks(&self) -> &[PassageChunk] {
        &self.chunks
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the corpus is empty (never true after a successful load)
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// SHA-256 of the raw corpus file, used to validate the embedding cache
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Build a store directly from chunks (for tests and tooling)
    pub fn from_chunks(chunks: Vec<PassageChunk>) -> Self {
        let mut hasher = Sha256::new();
        for chunk in &chunks {
            hasher.update(chunk.title.as_bytes());
            hasher.update(chunk.url.as_bytes());
            hasher.update(chunk.text.as_bytes());
        }
        let fingerprint = hex::encode(hasher.finalize());
        Self {
            chunks,
            fingerprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn loads_valid_lines_in_file_order() {
        let file = write_corpus(&[
            r#"{"title":"T1","url":"u1","chunk":"first"}"#,
            r#"{"title":"T2","url":"u2","chunk":"second"}"#,
        ]);

        let store = CorpusStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().text, "first");
        assert_eq!(store.get(1).unwrap().url, "u2");
    }

    #[test]
    fn skips_malformed_lines() {
        let file = write_corpus(&[
            r#"{"title":"T1","url":"u1","chunk":"a"}"#,
            r#"{"title":"T2","url":"u2","chunk":"b"}"#,
            "not json at all",
            r#"{"title":"T3","url":"u3","chunk":"c"}"#,
            r#"{"title":"T4","url":"u4","chunk":"d"}"#,
            r#"{"title":"T5","url":"u5","chunk":"e"}"#,
        ]);

        let store = CorpusStore::load(file.path()).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.get(2).unwrap().text, "c");
    }

    #[test]
    fn fails_when_no_valid_record_remains() {
        let file = write_corpus(&["garbage", "{\"broken\":"]);
        let err = CorpusStore::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::CorpusLoad(_)));
    }

    #[test]
    fn fails_on_missing_file() {
        let err = CorpusStore::load("/nonexistent/fatwas.jsonl").unwrap_err();
        assert!(matches!(err, Error::CorpusLoad(_)));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = write_corpus(&[r#"{"title":"T","url":"u","chunk":"x"}"#]);
        let b = write_corpus(&[r#"{"title":"T","url":"u","chunk":"y"}"#]);

        let store_a = CorpusStore::load(a.path()).unwrap();
        let store_b = CorpusStore::load(b.path()).unwrap();
        assert_ne!(store_a.fingerprint(), store_b.fingerprint());
    }
}
