//! Mapping helpers between chunker output, chunks, and index entries.

use crate::{
    index::{EntryMetadata, IndexEntry, content_id},
    processing::{chunking::ChunkSpan, types::Chunk},
};

/// Turn chunker spans into identified chunks.
///
/// Ids are derived from the chunk text, so the same text always receives the same id no matter
/// which document or ingestion call produced it.
pub(crate) fn build_chunks(spans: Vec<ChunkSpan>) -> Vec<Chunk> {
    spans
        .into_iter()
        .map(|span| Chunk {
            id: content_id(&span.text),
            text: span.text,
            source_offset: Some(span.token_offset),
        })
        .collect()
}

/// Pair chunks with their vectors. Callers validate that both sides have equal length.
pub(crate) fn into_entries(
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    source: Option<&str>,
) -> Vec<IndexEntry> {
    chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexEntry {
            id: chunk.id,
            vector,
            metadata: EntryMetadata {
                text: chunk.text,
                source: source.map(str::to_string),
                source_offset: chunk.source_offset,
            },
        })
        .collect()
}
