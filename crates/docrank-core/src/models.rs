//! Core data models shared by the store, the orchestrators, and callers.
//!
//! Timestamps are Unix milliseconds (UTC).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub file_name: String,
    pub content: String,
    pub content_type: String,
    /// Size of `content` in bytes.
    pub file_size: i64,
    pub uploaded_at: i64,
    pub indexed: bool,
    pub indexed_at: Option<i64>,
    pub chunk_count: i64,
}

impl Document {
    /// Build a fresh, not-yet-indexed document with a random id.
    pub fn new(file_name: &str, content: &str, content_type: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            content: content.to_string(),
            content_type: content_type.to_string(),
            file_size: content.len() as i64,
            uploaded_at: now_millis(),
            indexed: false,
            indexed_at: None,
            chunk_count: 0,
        }
    }
}

/// One chunking window of a document.
///
/// `embedding` is the vector produced by the model fitted when the chunk
/// was indexed. It is kept as a snapshot only; query-time scoring always
/// re-derives vectors from `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: i64,
}

/// A ranked query hit. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub document: Document,
    /// Cosine similarity (or reranked score) in `[0.0, 1.0]`.
    pub similarity: f32,
    /// 1-based position after sorting.
    pub rank: usize,
}

/// Aggregate counts over the whole corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub documents: i64,
    pub indexed_documents: i64,
    pub chunks: i64,
    pub embedded_chunks: i64,
}

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a Unix-millisecond timestamp as ISO 8601.
pub fn format_ts_iso(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts_millis.to_string())
}
