//! Core data types and error definitions for the retrieval pipeline.

use crate::{embedding::EmbeddingClientError, index::IndexError};
use thiserror::Error;

/// Errors produced while turning a file into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File extension is not one the extractor understands.
    #[error("unsupported document format: {path}")]
    UnsupportedFormat {
        /// Path whose extension was rejected.
        path: String,
    },
    /// Source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to open or read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// PDF decoder rejected the document.
    #[error("failed to decode PDF {path}: {message}")]
    Pdf {
        /// Path of the offending document.
        path: String,
        /// Decoder diagnostic.
        message: String,
    },
}

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Window geometry would never advance (`overlap >= size`).
    #[error("invalid chunk config: overlap {overlap} must be smaller than size {size}")]
    InvalidChunkConfig {
        /// Requested window width.
        size: usize,
        /// Requested overlap.
        overlap: usize,
    },
}

/// Errors emitted by [`crate::processing::RetrievalEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Extraction step failed (including unsupported formats).
    #[error("Failed to extract document: {0}")]
    Extraction(#[from] ExtractionError),
    /// Chunking step rejected its configuration.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed or returned malformed vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index rejected or failed a request.
    #[error("Vector index request failed: {0}")]
    Index(#[from] IndexError),
    /// Caller supplied an out-of-range argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    /// Whether the error was caused by the caller's input rather than a collaborator outage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Extraction(_)
                | Self::Chunking(_)
                | Self::InvalidArgument(_)
                | Self::Index(IndexError::InvalidTopK(_))
        )
    }
}

/// Immutable unit of retrieval produced during ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Content-derived identifier.
    pub id: String,
    /// Chunk text.
    pub text: String,
    /// Index of the chunk's first whitespace token in the extracted text.
    pub source_offset: Option<usize>,
}
