//! Fixed-window text chunker with overlap.
//!
//! Splits document text into overlapping windows of `window_chars`
//! characters. Consecutive windows share `overlap_chars` characters, so the
//! window start advances by `step = window_chars - overlap_chars`.
//!
//! Windows ignore word and sentence boundaries. Offsets are counted in
//! `char`s, never bytes, so multi-byte text is never split inside a code
//! point.
//!
//! # Algorithm
//!
//! 1. Start at offset 0.
//! 2. Emit `text[offset .. min(offset + window, len)]`.
//! 3. Advance offset by `step`; repeat while `offset < len`.
//!
//! Empty input yields no chunks. Input shorter than the window yields one
//! chunk equal to the input. The last window may be short; it is never padded.
//!
//! # Example
//!
//! ```rust
//! use docrank_core::chunk::{split_windows, ChunkParams};
//!
//! let text = "a".repeat(1200);
//! let windows = split_windows(&text, &ChunkParams::default());
//! let lens: Vec<usize> = windows.iter().map(|w| w.len()).collect();
//! assert_eq!(lens, vec![500, 500, 300]);
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{now_millis, DocumentChunk};

/// Default window size in characters.
pub const DEFAULT_WINDOW_CHARS: usize = 500;

/// Default overlap between consecutive windows in characters.
pub const DEFAULT_OVERLAP_CHARS: usize = 50;

/// Window geometry, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub window_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            window_chars: DEFAULT_WINDOW_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

impl ChunkParams {
    /// Distance between consecutive window starts. Never zero.
    pub fn step(&self) -> usize {
        self.window_chars.saturating_sub(self.overlap_chars).max(1)
    }
}

/// Split `text` into overlapping windows.
pub fn split_windows(text: &str, params: &ChunkParams) -> Vec<String> {
    if text.is_empty() || params.window_chars == 0 {
        return Vec::new();
    }

    // Byte offset of every char, so windows can be sliced without copying
    // char by char.
    let starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let len = starts.len();
    let byte_at = |n: usize| if n >= len { text.len() } else { starts[n] };

    let step = params.step();
    let mut windows = Vec::with_capacity(len / step + 1);
    let mut offset = 0;
    while offset < len {
        let end = (offset + params.window_chars).min(len);
        windows.push(text[byte_at(offset)..byte_at(end)].to_string());
        offset += step;
    }
    windows
}

/// Split a document's text into [`DocumentChunk`]s.
///
/// Chunk indices are contiguous from 0. Each chunk carries a fresh UUID and
/// the SHA-256 of its text; `embedding` is left empty for the indexer.
pub fn chunk_text(document_id: &str, text: &str, params: &ChunkParams) -> Vec<DocumentChunk> {
    split_windows(text, params)
        .into_iter()
        .enumerate()
        .map(|(i, window)| make_chunk(document_id, i as i64, window))
        .collect()
}

/// Hex SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(document_id: &str, index: i64, text: String) -> DocumentChunk {
    DocumentChunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        hash: content_hash(&text),
        text,
        embedding: None,
        created_at: now_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert!(split_windows("", &ChunkParams::default()).is_empty());
        assert!(chunk_text("doc1", "", &ChunkParams::default()).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", &ChunkParams::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].document_id, "doc1");
    }

    #[test]
    fn test_window_lengths_and_starts() {
        let text: String = (0..1200).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let windows = split_windows(&text, &ChunkParams::default());
        let lens: Vec<usize> = windows.iter().map(|w| w.len()).collect();
        assert_eq!(lens, vec![500, 500, 300]);
        for (w, start) in windows.iter().zip([0usize, 450, 900]) {
            assert_eq!(w.as_str(), &text[start..(start + w.len())]);
        }
    }

    #[test]
    fn test_exact_window_length() {
        let text = "x".repeat(500);
        let windows = split_windows(&text, &ChunkParams::default());
        // 450 < 500, so a trailing 50-char window follows the full one.
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].len(), 50);
    }

    #[test]
    fn test_overlap_content_shared() {
        let text: String = (0..600).map(|i| char::from(b'0' + (i % 10) as u8)).collect();
        let windows = split_windows(&text, &ChunkParams::default());
        assert_eq!(&windows[0][450..500], &windows[1][..50]);
    }

    #[test]
    fn test_multibyte_chars_counted_as_chars() {
        let text = "ж".repeat(520);
        let windows = split_windows(&text, &ChunkParams::default());
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].chars().count(), 500);
        assert_eq!(windows[1].chars().count(), 70);
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = "word ".repeat(1000);
        let chunks = chunk_text("doc1", &text, &ChunkParams::default());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.hash, content_hash(&c.text));
            assert!(c.embedding.is_none());
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "The quick brown fox. ".repeat(80);
        let a = chunk_text("doc1", &text, &ChunkParams::default());
        let b = chunk_text("doc1", &text, &ChunkParams::default());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.text, y.text);
            assert_eq!(x.hash, y.hash);
        }
    }

    #[test]
    fn test_overlap_not_smaller_than_window_still_terminates() {
        let params = ChunkParams {
            window_chars: 10,
            overlap_chars: 10,
        };
        assert_eq!(params.step(), 1);
        assert_eq!(split_windows("abcdefghijkl", &params).len(), 12);
    }
}
