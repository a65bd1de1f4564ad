//! Retrieval engine coordinating extraction, chunking, embedding, and index operations.

use crate::{
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client, validate_embeddings},
    index::{VectorIndex, select_index},
    metrics::{EngineMetrics, MetricsSnapshot},
    processing::{
        chunking::{ChunkConfig, chunk_spans},
        extraction::extract_text,
        mappers::{build_chunks, into_entries},
        types::EngineError,
    },
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Tunables the engine needs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Chunk window width in whitespace tokens.
    pub chunk_size: usize,
    /// Tokens shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Width every embedding must have.
    pub embedding_dimension: usize,
    /// Result count used when callers do not pick one.
    pub default_top_k: usize,
}

impl EngineSettings {
    /// Extract engine settings from the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            embedding_dimension: config.embedding_dimension,
            default_top_k: config.search_top_k,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Coordinates ingestion (extract → chunk → embed → upsert) and semantic search.
///
/// The engine owns the embedding client, the vector index selected at construction, and the
/// activity counters. Construct it once and share it through an `Arc`.
pub struct RetrievalEngine {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    index: Box<dyn VectorIndex>,
    settings: EngineSettings,
    metrics: Arc<EngineMetrics>,
}

/// Abstraction over the engine used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait RetrievalApi: Send + Sync {
    /// Extract, chunk, embed, and index a document. Returns the number of chunks added.
    async fn ingest(&self, path: &Path, precomputed_text: &str) -> Result<usize, EngineError>;

    /// Chunk, embed, and index already-extracted text.
    async fn ingest_text(&self, text: &str, source: Option<&str>) -> Result<usize, EngineError>;

    /// Return up to `top_k` chunk texts ranked by similarity to `query`.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, EngineError>;

    /// Search and join the results into a single context block for a language model.
    async fn context(&self, query: &str, top_k: usize) -> Result<String, EngineError>;

    /// Result count used when a caller does not specify one.
    fn default_top_k(&self) -> usize;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RetrievalEngine {
    /// Assemble an engine from explicit collaborators.
    pub fn new(
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        index: Box<dyn VectorIndex>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            embedding_client,
            index,
            settings,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Build an engine from configuration, selecting the index backend.
    pub async fn from_config(config: &Config) -> Result<Self, EngineError> {
        tracing::info!("Initializing embedding client");
        let embedding_client = build_embedding_client(config);
        let index = select_index(config).await?;
        tracing::info!(
            backend = index.backend_name(),
            chunk_size = config.chunk_size,
            chunk_overlap = config.chunk_overlap,
            "Retrieval engine ready"
        );
        Ok(Self::new(
            embedding_client,
            index,
            EngineSettings::from_config(config),
        ))
    }

    /// Extract a document at `path` and ingest its text.
    pub async fn ingest(&self, path: &Path, precomputed_text: &str) -> Result<usize, EngineError> {
        tracing::info!(path = %path.display(), "Ingesting document");
        let text = extract_text(path, precomputed_text).await?;
        let source = path.display().to_string();
        self.ingest_text(&text, Some(&source)).await
    }

    /// Chunk, embed, and index already-extracted text.
    ///
    /// Embeddings for the whole document are computed and validated before anything is written,
    /// so a provider failure leaves the index untouched.
    pub async fn ingest_text(&self, text: &str, source: Option<&str>) -> Result<usize, EngineError> {
        let chunk_config = ChunkConfig::new(self.settings.chunk_size, self.settings.chunk_overlap)?;
        let chunks = build_chunks(chunk_spans(text, &chunk_config));
        if chunks.is_empty() {
            tracing::info!(source = ?source, "Document produced no chunks");
            self.metrics.record_document(0);
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedding_client.generate_embeddings(texts).await?;
        validate_embeddings(&vectors, chunks.len(), self.settings.embedding_dimension)?;

        let entries = into_entries(chunks, vectors, source);
        let chunk_count = entries.len();
        self.index.upsert(entries).await?;

        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            source = ?source,
            chunks = chunk_count,
            chunk_size = chunk_config.size(),
            overlap = chunk_config.overlap(),
            backend = self.index.backend_name(),
            "Document indexed"
        );
        Ok(chunk_count)
    }

    /// Return up to `top_k` chunk texts, best match first.
    ///
    /// An empty query is embedded like any other string. Embedding and index failures are
    /// returned as errors, never as an empty result.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, EngineError> {
        if top_k == 0 {
            return Err(EngineError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }

        let vectors = self
            .embedding_client
            .generate_embeddings(vec![query.to_string()])
            .await?;
        validate_embeddings(&vectors, 1, self.settings.embedding_dimension)?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or(EmbeddingClientError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;

        let matches = self.index.query(&vector, top_k).await?;
        self.metrics.record_search();
        tracing::debug!(
            top_k,
            results = matches.len(),
            backend = self.index.backend_name(),
            "Search completed"
        );
        Ok(matches.into_iter().map(|hit| hit.text).collect())
    }

    /// Search and join the ranked chunk texts with newlines.
    pub async fn context(&self, query: &str, top_k: usize) -> Result<String, EngineError> {
        Ok(self.search(query, top_k).await?.join("\n"))
    }

    /// Result count used when a caller does not specify one.
    pub fn default_top_k(&self) -> usize {
        self.settings.default_top_k
    }

    /// Label of the index backend selected at construction.
    pub fn backend_name(&self) -> &'static str {
        self.index.backend_name()
    }

    /// Number of entries currently stored in the index.
    pub async fn indexed_entries(&self) -> Result<usize, EngineError> {
        Ok(self.index.count().await?)
    }

    /// Return the current activity metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl RetrievalApi for RetrievalEngine {
    async fn ingest(&self, path: &Path, precomputed_text: &str) -> Result<usize, EngineError> {
        RetrievalEngine::ingest(self, path, precomputed_text).await
    }

    async fn ingest_text(&self, text: &str, source: Option<&str>) -> Result<usize, EngineError> {
        RetrievalEngine::ingest_text(self, text, source).await
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, EngineError> {
        RetrievalEngine::search(self, query, top_k).await
    }

    async fn context(&self, query: &str, top_k: usize) -> Result<String, EngineError> {
        RetrievalEngine::context(self, query, top_k).await
    }

    fn default_top_k(&self) -> usize {
        RetrievalEngine::default_top_k(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RetrievalEngine::metrics_snapshot(self)
    }
}
