//! In-memory [`DocumentStore`] implementation.
//!
//! Keeps documents and chunks in `Vec`s behind `std::sync::RwLock`.
//! Insertion order is preserved, which gives [`list_chunks`] the stable
//! ordering the ranker relies on for ties.
//!
//! [`list_chunks`]: DocumentStore::list_chunks

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{CorpusStats, Document, DocumentChunk};

use super::DocumentStore;

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
    chunks: RwLock<Vec<DocumentChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let mut docs = write(&self.docs)?;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(read(&self.docs)?.iter().find(|d| d.id == id).cloned())
    }

    async fn get_document_by_file_name(&self, file_name: &str) -> Result<Option<Document>> {
        Ok(read(&self.docs)?
            .iter()
            .find(|d| d.file_name == file_name)
            .cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        // Newest first; ties go to the later insert, as in SQLite's rowid order.
        let mut docs: Vec<Document> = read(&self.docs)?.iter().rev().cloned().collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(docs)
    }

    async fn list_chunks(&self) -> Result<Vec<DocumentChunk>> {
        Ok(read(&self.chunks)?.clone())
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        let mut chunks: Vec<DocumentChunk> = read(&self.chunks)?
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
        let mut chunks = write(&self.chunks)?;
        chunks.retain(|c| c.id != chunk.id);
        chunks.push(chunk.clone());
        Ok(())
    }

    async fn update_index_status(
        &self,
        document_id: &str,
        indexed: bool,
        indexed_at: Option<i64>,
        chunk_count: i64,
    ) -> Result<()> {
        let mut docs = write(&self.docs)?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| anyhow!("document not found: {}", document_id))?;
        doc.indexed = indexed;
        doc.indexed_at = indexed_at;
        doc.chunk_count = chunk_count;
        Ok(())
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<()> {
        write(&self.chunks)?.retain(|c| c.document_id != document_id);
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        write(&self.chunks)?.retain(|c| c.document_id != id);
        write(&self.docs)?.retain(|d| d.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        write(&self.chunks)?.clear();
        write(&self.docs)?.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CorpusStats> {
        let docs = read(&self.docs)?;
        let chunks = read(&self.chunks)?;
        Ok(CorpusStats {
            documents: docs.len() as i64,
            indexed_documents: docs.iter().filter(|d| d.indexed).count() as i64,
            chunks: chunks.len() as i64,
            embedded_chunks: chunks.iter().filter(|c| c.embedding.is_some()).count() as i64,
        })
    }
}
