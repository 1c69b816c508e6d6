//! Storage abstraction for docrank.
//!
//! The [`DocumentStore`] trait is the whole contract the orchestrators need
//! from persistence: load documents, enumerate the corpus's chunks, write
//! new chunks, flip a document's indexed status, and delete with cascade.
//! The SQLite backend lives in the application crate; [`memory`] provides an
//! in-process backend for tests and embedding in other programs.
//!
//! Implementations must be `Send + Sync` so orchestrations can run as
//! independent async tasks.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CorpusStats, Document, DocumentChunk};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](DocumentStore::insert_document) | Insert or replace a document record |
/// | [`get_document`](DocumentStore::get_document) | Look up a document by id |
/// | [`get_document_by_file_name`](DocumentStore::get_document_by_file_name) | Look up a document by file name |
/// | [`list_documents`](DocumentStore::list_documents) | All documents, newest upload first |
/// | [`list_chunks`](DocumentStore::list_chunks) | Every chunk in the corpus |
/// | [`chunks_for_document`](DocumentStore::chunks_for_document) | One document's chunks by index |
/// | [`insert_chunk`](DocumentStore::insert_chunk) | Persist one chunk with its embedding |
/// | [`update_index_status`](DocumentStore::update_index_status) | Record indexed flag, time, and chunk count |
/// | [`delete_chunks`](DocumentStore::delete_chunks) | Remove a document's chunks |
/// | [`delete_document`](DocumentStore::delete_document) | Remove a document and its chunks |
/// | [`delete_all`](DocumentStore::delete_all) | Empty the store |
/// | [`stats`](DocumentStore::stats) | Corpus counts |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    async fn get_document_by_file_name(&self, file_name: &str) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Every chunk across the corpus, in a stable order (document insertion,
    /// then chunk index). Ranking ties are broken by this order.
    async fn list_chunks(&self) -> Result<Vec<DocumentChunk>>;

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>>;

    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<()>;

    /// Set a document's indexed flag, indexed timestamp, and chunk count.
    /// Fails if the document does not exist.
    async fn update_index_status(
        &self,
        document_id: &str,
        indexed: bool,
        indexed_at: Option<i64>,
        chunk_count: i64,
    ) -> Result<()>;

    async fn delete_chunks(&self, document_id: &str) -> Result<()>;

    /// Delete a document and, with it, all of its chunks.
    async fn delete_document(&self, id: &str) -> Result<()>;

    async fn delete_all(&self) -> Result<()>;

    async fn stats(&self) -> Result<CorpusStats>;
}
