//! Shared types used by the vector index backends.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned by vector index backends.
///
/// `InvalidUrl`, `Http`, and `UnexpectedStatus` all mean the remote index is unavailable.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid index URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Remote index responded with an unexpected status code.
    #[error("Unexpected index response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Query asked for fewer than one result.
    #[error("top_k must be at least 1, got {0}")]
    InvalidTopK(usize),
    /// Vector width does not match the index dimension.
    #[error("Vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was created with.
        expected: usize,
        /// Width of the offending vector.
        actual: usize,
    },
}

impl IndexError {
    /// Whether the failure came from the remote service rather than the caller's input.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::Http(_) | Self::UnexpectedStatus { .. }
        )
    }
}

/// Metadata persisted next to each vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryMetadata {
    /// Chunk text returned by searches.
    pub text: String,
    /// Path of the document the chunk came from.
    pub source: Option<String>,
    /// Index of the chunk's first token in the extracted document text.
    pub source_offset: Option<usize>,
}

/// Persisted unit inside a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Entry identifier (a UUID string).
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Stored metadata.
    pub metadata: EntryMetadata,
}

/// Scored result of a nearest-neighbor query.
///
/// `score` is backend-defined: cosine similarity for the remote index (higher is closer),
/// Euclidean distance for the local index (lower is closer). Matches are always ordered best
/// first, so callers never need to interpret it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    /// Identifier of the matched entry.
    pub id: String,
    /// Stored chunk text.
    pub text: String,
    /// Backend-defined closeness score.
    pub score: f32,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct CountResponse {
    pub(crate) result: CountResult,
}

#[derive(Deserialize)]
pub(crate) struct CountResult {
    pub(crate) count: usize,
}
