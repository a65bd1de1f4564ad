#![deny(missing_docs)]

//! Retrieval engine behind the MindGap study assistant.
//!
//! Documents are extracted to text, split into overlapping word windows, embedded, and stored in
//! a vector index (a managed Qdrant collection or an in-process fallback). Queries return the
//! most similar chunk texts for grounding tutor answers.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Vector index backends.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and search counters.
pub mod metrics;
/// Extraction, chunking, and retrieval orchestration.
pub mod processing;
/// Quiz performance ledger.
pub mod progress;
