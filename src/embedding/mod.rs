//! Embedding client abstraction and adapters.
//!
//! The engine treats the embedding model as a black box: a list of strings goes in, one
//! fixed-dimension vector per string comes out, in order. Providers never retry.

mod ollama;
mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider could not be reached or refused to produce embeddings.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Provider returned a different number of vectors than inputs.
    #[error("Embedding provider returned {actual} vectors for {expected} inputs")]
    CountMismatch {
        /// Number of inputs sent.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// Provider returned a vector of the wrong width.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured embedding dimension.
        expected: usize,
        /// Width of the offending vector.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient {
    /// Produce an embedding vector for each supplied text, preserving order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Check that a provider answered with one vector of width `dimension` per input.
pub fn validate_embeddings(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbeddingClientError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingClientError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Deterministic offline embedder that hashes bytes into vector slots.
///
/// Identical input always yields an identical, L2-normalized vector, which makes it usable both
/// as a zero-dependency default and as a test double.
pub struct HashingClient {
    dimension: usize,
}

impl HashingClient {
    /// Construct a hashing embedder producing vectors of width `dimension`.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::Unavailable(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        tracing::trace!(dimension = self.dimension, texts = texts.len(), "Hashing embeddings");
        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }
}

/// Build an embedding client suitable for the given configuration.
pub fn build_embedding_client(config: &Config) -> Box<dyn EmbeddingClient + Send + Sync> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Selecting embedding client"
    );
    match config.embedding_provider {
        EmbeddingProvider::Hash => Box::new(HashingClient::new(config.embedding_dimension)),
        EmbeddingProvider::Ollama => Box::new(OllamaClient::new(
            &config.ollama_url,
            &config.embedding_model,
        )),
        EmbeddingProvider::OpenAI => Box::new(OpenAiClient::new(
            &config.openai_base_url,
            config.openai_api_key.clone().unwrap_or_default(),
            &config.embedding_model,
        )),
    }
}

pub(crate) fn http_client(user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}
