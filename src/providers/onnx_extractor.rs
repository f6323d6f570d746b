//! ONNX extractive question answering
//!
//! Runs a SQuAD-style QA head (AraElectra-Arabic-SQuADv2-QA by
//! default) on a (question, context) pair. Start and end logits are
//! softmaxed over the context-segment tokens only, the best valid span
//! among them is selected, and its probability mass
//! (p_start * p_end) is reported as the confidence score.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use tokenizers::Tokenizer;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::providers::{hub, SpanExtractor};
use crate::types::SpanCandidate;

/// ONNX-based answer span extractor
pub struct OnnxSpanExtractor {
    /// ONNX Runtime session; `run` takes `&mut self`
    session: Mutex<Session>,
    /// HuggingFace tokenizer
    tokenizer: Tokenizer,
    /// Maximum sequence length for the encoded pair
    max_length: usize,
    /// Maximum answer span length in tokens
    max_answer_tokens: usize,
    /// Model id, reported as the extractor's name
    model: String,
}

impl OnnxSpanExtractor {
    /// Download (if needed) and load the extraction model
    pub async fn load(config: &ExtractionConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX span extractor with model: {}", config.model);

        let files = hub::ensure_model_files(&config.model, &config.cache_dir).await?;

        let session = Session::builder()
            .map_err(|e| Error::model(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::model(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::model(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&files.model)
            .map_err(|e| Error::model(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::model(format!("Failed to load tokenizer: {}", e)))?;

        tracing::info!("ONNX span extractor initialized");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length: config.max_length,
            max_answer_tokens: config.max_answer_tokens,
            model: config.model.clone(),
        })
    }

    fn extract_sync(&self, question: &str, context: &str) -> Result<SpanCandidate> {
        let encoding = self
            .tokenizer
            .encode((question, context), true)
            .map_err(|e| Error::extraction(format!("Tokenization failed: {}", e)))?;

        let seq_len = encoding.get_ids().len().min(self.max_length).max(1);

        let mut input_ids = vec![0i64; seq_len];
        let mut attention_mask = vec![0i64; seq_len];
        let mut token_type_ids = vec![0i64; seq_len];

        for j in 0..seq_len.min(encoding.get_ids().len()) {
            input_ids[j] = encoding.get_ids()[j] as i64;
            attention_mask[j] = encoding.get_attention_mask()[j] as i64;
            token_type_ids[j] = encoding.get_type_ids()[j] as i64;
        }

        let input_ids_tensor =
            Tensor::from_array((vec![1, seq_len], input_ids.into_boxed_slice()))
                .map_err(|e| Error::extraction(format!("Input tensor creation failed: {}", e)))?;

        let attention_mask_tensor =
            Tensor::from_array((vec![1, seq_len], attention_mask.clone().into_boxed_slice()))
                .map_err(|e| {
                    Error::extraction(format!("Attention mask tensor creation failed: {}", e))
                })?;

        let token_type_ids_tensor =
            Tensor::from_array((vec![1, seq_len], token_type_ids.into_boxed_slice()))
                .map_err(|e| {
                    Error::extraction(format!("Token type tensor creation failed: {}", e))
                })?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| Error::extraction(format!("Inference failed: {}", e)))?;
        let output_iter: Vec<_> = outputs.iter().collect();

        let start_logits = extract_logits(&output_iter, "start_logits", 0, seq_len)?;
        let end_logits = extract_logits(&output_iter, "end_logits", 1, seq_len)?;

        // Only tokens of the context segment are eligible span boundaries
        let sequence_ids = encoding.get_sequence_ids();
        let offsets = encoding.get_offsets();
        let allowed: Vec<bool> = (0..seq_len)
            .map(|j| {
                attention_mask[j] == 1
                    && sequence_ids.get(j).copied().flatten() == Some(1)
                    && offsets.get(j).map(|(s, e)| e > s).unwrap_or(false)
            })
            .collect();

        // Probabilities are normalized over the context segment only;
        // question and special tokens carry zero mass.
        let start_probs = masked_softmax(&start_logits, &allowed);
        let end_probs = masked_softmax(&end_logits, &allowed);

        let Some((start, end, score)) =
            best_span(&start_probs, &end_probs, &allowed, self.max_answer_tokens)
        else {
            return Ok(SpanCandidate::empty());
        };

        let span_start = offsets[start].0;
        let span_end = offsets[end].1;
        let text = context
            .get(span_start..span_end)
            .unwrap_or("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Ok(SpanCandidate::empty());
        }

        Ok(SpanCandidate { text, score })
    }
}

#[async_trait]
impl SpanExtractor for OnnxSpanExtractor {
    async fn extract(&self, question: &str, context: &str) -> Result<SpanCandidate> {
        if context.trim().is_empty() {
            return Ok(SpanCandidate::empty());
        }
        self.extract_sync(question, context)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Pull one logits row out of the session outputs, by name with a
/// positional fallback
fn extract_logits(
    outputs: &[(&str, ort::value::ValueRef<'_>)],
    name: &str,
    position: usize,
    seq_len: usize,
) -> Result<Vec<f32>> {
    let value = outputs
        .iter()
        .find(|(n, _)| *n == name)
        .or_else(|| outputs.get(position))
        .map(|(_, v)| v)
        .ok_or_else(|| Error::extraction(format!("Missing output tensor: {}", name)))?;

    let (_, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| Error::extraction(format!("Failed to extract {}: {}", name, e)))?;

    Ok(data.iter().take(seq_len).copied().collect())
}

/// Softmax over the positions where `mask` is true; masked positions
/// get probability zero
fn masked_softmax(logits: &[f32], mask: &[bool]) -> Vec<f32> {
    let max = logits
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(&l, _)| l)
        .fold(f32::NEG_INFINITY, f32::max);

    if max == f32::NEG_INFINITY {
        return vec![0.0; logits.len()];
    }

    let exps: Vec<f32> = logits
        .iter()
        .zip(mask)
        .map(|(&l, &m)| if m { (l - max).exp() } else { 0.0 })
        .collect();

    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return vec![0.0; logits.len()];
    }

    exps.into_iter().map(|e| e / sum).collect()
}

/// Highest-probability (start, end) pair with end >= start, both
/// positions allowed, and span length bounded by `max_span` tokens
///
/// Score is p_start * p_end, which stays in [0, 1].
fn best_span(
    start_probs: &[f32],
    end_probs: &[f32],
    allowed: &[bool],
    max_span: usize,
) -> Option<(usize, usize, f32)> {
    let n = start_probs.len().min(end_probs.len()).min(allowed.len());
    let max_span = max_span.max(1);
    let mut best: Option<(usize, usize, f32)> = None;

    for start in 0..n {
        if !allowed[start] {
            continue;
        }
        let end_limit = (start + max_span).min(n);
        for end in start..end_limit {
            if !allowed[end] {
                continue;
            }
            let score = start_probs[start] * end_probs[end];
            if best.map(|(_, _, s)| score > s).unwrap_or(true) {
                best = Some((start, end, score));
            }
        }
    }

    best
}
