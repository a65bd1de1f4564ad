//! Document retrieval pipeline: extraction, chunking, embedding, and index orchestration.

pub mod chunking;
pub mod extraction;
mod mappers;
mod service;
pub mod types;

pub use chunking::{ChunkConfig, ChunkSpan, chunk_spans, chunk_text};
pub use extraction::{DocumentKind, extract_text};
pub use service::{EngineSettings, RetrievalApi, RetrievalEngine};
pub use types::{Chunk, ChunkingError, EngineError, ExtractionError};
