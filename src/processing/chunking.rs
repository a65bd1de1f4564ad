//! Word-window chunking.
//!
//! Text is split on whitespace and cut into windows of `size` tokens. Consecutive windows share
//! `overlap` tokens, so the window start advances by `size - overlap`. Iteration stops after the
//! first window that reaches the final token, which means:
//!
//! - empty (or all-whitespace) text produces no chunks;
//! - text with fewer than `size` tokens produces exactly one chunk;
//! - every token lands in at least one chunk.
//!
//! Chunking is a pure function of its inputs; re-running it on identical input yields an
//! identical sequence.

use super::types::ChunkingError;

/// Default window width in whitespace tokens.
pub const DEFAULT_CHUNK_SIZE: usize = 450;
/// Default number of tokens shared by adjacent windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;

/// Validated window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    /// Validate a window configuration. `overlap` must be strictly smaller than `size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if overlap >= size {
            return Err(ChunkingError::InvalidChunkConfig { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    /// Window width in tokens.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tokens shared by adjacent windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of adjacent windows. Always at least one.
    pub fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A chunk of text together with the index of its first token in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Window tokens joined by single spaces.
    pub text: String,
    /// Index of the window's first whitespace token.
    pub token_offset: usize,
}

/// Split `text` into overlapping word windows.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkingError> {
    let config = ChunkConfig::new(size, overlap)?;
    Ok(chunk_spans(text, &config)
        .into_iter()
        .map(|span| span.text)
        .collect())
}

/// Split `text` into overlapping word windows, keeping each window's token offset.
pub fn chunk_spans(text: &str, config: &ChunkConfig) -> Vec<ChunkSpan> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    window_starts(tokens.len(), config)
        .map(|start| {
            let end = (start + config.size).min(tokens.len());
            ChunkSpan {
                text: tokens[start..end].join(" "),
                token_offset: start,
            }
        })
        .collect()
}

fn window_starts(token_count: usize, config: &ChunkConfig) -> impl Iterator<Item = usize> {
    let size = config.size;
    let stride = config.stride();
    (0..token_count)
        .step_by(stride)
        .take_while(move |start| *start == 0 || start + size - stride < token_count)
}
