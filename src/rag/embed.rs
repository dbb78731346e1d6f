use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{EmbeddingBackend, LlmConfig};

const EMBED_BATCH_SIZE: usize = 64;
pub const LOCAL_EMBEDDING_DIM: usize = 384;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Embedding API key is required (set OPENAI_API_KEY or [llm].api_key)")]
    MissingApiKey,

    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Turns text into vectors. Implementations must return one vector per input, in order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifies the model so persisted indexes are not queried with a different one.
    fn model_id(&self) -> &str;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Build the embedder selected by configuration.
pub fn from_config(config: &LlmConfig) -> Result<Box<dyn Embedder>, EmbedError> {
    match config.embedding_backend {
        EmbeddingBackend::OpenAi => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        EmbeddingBackend::Local => Ok(Box::new(HashEmbedder::default())),
    }
}

/// OpenAI-compatible `/embeddings` client.
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(config: &LlmConfig) -> Result<Self, EmbedError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.embedding_model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn embed_batch(&self, api_key: &str, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let payload = EmbeddingsRequest {
            model: &self.model,
            input: batch,
        };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body: crate::rag::format::truncate_text(&body, 160),
            });
        }

        let mut parsed: EmbeddingsResponse = response.json().await?;
        if parsed.data.len() != batch.len() {
            return Err(EmbedError::CountMismatch {
                expected: batch.len(),
                got: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, texts), fields(model = %self.model, inputs = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self.api_key.as_deref().ok_or(EmbedError::MissingApiKey)?;

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            debug!(batch = batch.len(), "requesting embeddings");
            vectors.extend(self.embed_batch(api_key, batch).await?);
        }
        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Offline embedder: hashed word and bigram features, L2-normalized.
///
/// Deterministic across runs and platforms, so indexes it builds can be
/// persisted and reloaded.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(8);
        Self {
            dimensions,
            model_id: format!("local-hash-{dimensions}"),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0_f32; self.dimensions];
        for token in tokenize(text) {
            let hash = stable_hash(&token);
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + ((hash >> 48) & 0xFF) as f32 / 255.0;
            vector[index] += sign * weight;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(LOCAL_EMBEDDING_DIM)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn stable_hash(value: &str) -> u64 {
    let digest = Sha256::digest(value.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn tokenize(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut features = Vec::with_capacity(words.len() * 2);
    for (i, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(i + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
    if norm <= 0.0 {
        return;
    }
    for value in values {
        *value = (f64::from(*value) / norm) as f32;
    }
}

/// Cosine similarity; 0.0 for vectors of different length or zero norm.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut left_sq = 0.0_f64;
    let mut right_sq = 0.0_f64;
    for (l, r) in left.iter().zip(right) {
        dot += f64::from(*l) * f64::from(*r);
        left_sq += f64::from(*l).powi(2);
        right_sq += f64::from(*r).powi(2);
    }
    if left_sq == 0.0 || right_sq == 0.0 {
        return 0.0;
    }
    (dot / (left_sq.sqrt() * right_sq.sqrt())) as f32
}
