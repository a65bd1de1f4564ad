//! Vector index abstraction and its two backends.
//!
//! The backend is chosen once, in [`select_index`]: a managed Qdrant collection when remote
//! settings are configured, otherwise an in-process [`LocalIndex`]. Everything downstream talks
//! to `dyn VectorIndex` only.

pub mod local;
pub mod payload;
pub mod remote;
pub mod types;

pub use local::LocalIndex;
pub use payload::{compute_chunk_hash, content_id};
pub use remote::QdrantIndex;
pub use types::{EntryMetadata, IndexEntry, IndexError, IndexMatch};

use crate::config::Config;
use async_trait::async_trait;

/// Uniform upsert/query contract shared by every backend.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a batch of entries.
    ///
    /// The remote backend replaces entries whose id already exists; the local backend appends.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Return at most `top_k` matches for `vector`, best first.
    ///
    /// Fails with [`IndexError::InvalidTopK`] when `top_k` is zero. An empty index yields an
    /// empty result.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>, IndexError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, IndexError>;

    /// Short backend label for logs and diagnostics.
    fn backend_name(&self) -> &'static str;
}

/// Pick and prepare the index backend for the given configuration.
///
/// Remote settings that cannot even produce a client (for example a malformed URL) fall back to
/// the local index with a warning. Once a remote client exists, failing to create the collection
/// is an error.
pub async fn select_index(config: &Config) -> Result<Box<dyn VectorIndex>, IndexError> {
    if let Some(settings) = config.remote_index() {
        match QdrantIndex::new(&settings) {
            Ok(remote) => {
                remote.ensure_index(config.embedding_dimension).await?;
                tracing::info!(collection = %settings.collection, "Using remote vector index");
                return Ok(Box::new(remote));
            }
            Err(error) => {
                tracing::warn!(error = %error, "Remote index unusable; falling back to local index");
            }
        }
    }

    tracing::info!(
        dimension = config.embedding_dimension,
        "Using local in-memory vector index"
    );
    Ok(Box::new(LocalIndex::new(config.embedding_dimension)))
}
