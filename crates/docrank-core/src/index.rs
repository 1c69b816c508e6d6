//! Indexing orchestration for a single document.
//!
//! Drives `Pending → Chunking → Fitting → Embedding(i/N) → Persisted`, or
//! ends in `Failed`. Every stage change and every embedded chunk is reported
//! through an [`IndexProgressReporter`]; the final event carries either
//! [`STATUS_COMPLETED`] or `"Error: <reason>"`.
//!
//! The outcome is also returned as a typed `Result<IndexReport, IndexError>`
//! so callers never have to parse the status string.
//!
//! # Corpus fitting
//!
//! The vectorizer is fitted over every chunk already stored for *other*
//! documents plus the new chunks of this one. A document that was indexed
//! before has its old chunks excluded from the fit and replaced, so
//! re-indexing never duplicates chunks.
//!
//! The document is marked un-indexed before its old chunks are removed and
//! only marked indexed again once every new chunk is stored.
//!
//! # Failure
//!
//! If a write fails after the old chunks were removed, the chunks written so
//! far are deleted and the document is reset to un-indexed, both best
//! effort. A document is never left marked indexed with a partial chunk set.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunk::{chunk_text, ChunkParams};
use crate::error::IndexError;
use crate::models::now_millis;
use crate::store::DocumentStore;
use crate::vectorizer::{Vectorizer, VectorizerParams};

/// Status text of the final event of a successful run.
pub const STATUS_COMPLETED: &str = "Indexing completed";

/// Where an indexing run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStage {
    Pending,
    Chunking,
    Fitting,
    Embedding,
    Persisted,
    Failed,
}

/// One progress event of an indexing run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexingProgress {
    pub document_id: String,
    pub file_name: String,
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub stage: IndexStage,
    /// Human-readable status line.
    pub status: String,
}

impl IndexingProgress {
    /// True for the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, IndexStage::Persisted | IndexStage::Failed)
    }
}

/// Receives indexing progress, in order, from one run.
///
/// Called inline from the embedding loop, so implementations must not block.
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexingProgress);
}

impl<F> IndexProgressReporter for F
where
    F: Fn(IndexingProgress) + Send + Sync,
{
    fn report(&self, event: IndexingProgress) {
        self(event)
    }
}

/// Chunking and vectorizer settings for an indexing run.
#[derive(Debug, Clone, Default)]
pub struct IndexParams {
    pub chunking: ChunkParams,
    pub vectorizer: VectorizerParams,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub document_id: String,
    pub file_name: String,
    pub chunk_count: usize,
    /// Vocabulary size of the model the stored embeddings were produced with.
    pub vocabulary_size: usize,
    pub indexed_at: i64,
}

/// Tracks what is known about the run so far, for progress events.
struct Run<'a> {
    reporter: &'a dyn IndexProgressReporter,
    document_id: String,
    file_name: String,
    total_chunks: usize,
    processed_chunks: usize,
}

impl Run<'_> {
    fn emit(&self, stage: IndexStage, status: impl Into<String>) {
        self.reporter.report(IndexingProgress {
            document_id: self.document_id.clone(),
            file_name: self.file_name.clone(),
            total_chunks: self.total_chunks,
            processed_chunks: self.processed_chunks,
            stage,
            status: status.into(),
        });
    }
}

/// Index one document: chunk, fit, embed, persist, mark indexed.
pub async fn index_document<S: DocumentStore + ?Sized>(
    store: &S,
    document_id: &str,
    params: &IndexParams,
    reporter: &dyn IndexProgressReporter,
) -> Result<IndexReport, IndexError> {
    let mut run = Run {
        reporter,
        document_id: document_id.to_string(),
        file_name: String::new(),
        total_chunks: 0,
        processed_chunks: 0,
    };

    match run_stages(store, params, &mut run).await {
        Ok(report) => {
            info!(
                document = %report.document_id,
                file = %report.file_name,
                chunks = report.chunk_count,
                "document indexed"
            );
            Ok(report)
        }
        Err(err) => {
            warn!(document = %document_id, error = %err, "indexing failed");
            run.emit(IndexStage::Failed, format!("Error: {}", err));
            Err(err)
        }
    }
}

async fn run_stages<S: DocumentStore + ?Sized>(
    store: &S,
    params: &IndexParams,
    run: &mut Run<'_>,
) -> Result<IndexReport, IndexError> {
    let document = store
        .get_document(&run.document_id)
        .await
        .map_err(IndexError::unexpected)?
        .ok_or_else(|| IndexError::NotFound(run.document_id.clone()))?;
    run.file_name = document.file_name.clone();
    run.emit(IndexStage::Pending, "Starting indexing...");

    run.emit(IndexStage::Chunking, "Chunking document...");
    let mut chunks = chunk_text(&document.id, &document.content, &params.chunking);
    run.total_chunks = chunks.len();

    run.emit(IndexStage::Fitting, "Training vectorizer...");
    let existing = store.list_chunks().await.map_err(IndexError::unexpected)?;
    let corpus: Vec<&str> = existing
        .iter()
        .filter(|c| c.document_id != document.id)
        .map(|c| c.text.as_str())
        .chain(chunks.iter().map(|c| c.text.as_str()))
        .collect();
    let vectorizer = Vectorizer::fitted(params.vectorizer.clone(), &corpus);
    debug!(
        corpus = corpus.len(),
        vocabulary = vectorizer.vocabulary_size(),
        "vectorizer trained for indexing"
    );
    let replaced = existing.iter().any(|c| c.document_id == document.id);
    drop(existing);

    if replaced {
        debug!(document = %document.id, "replacing previously indexed chunks");
    }
    // Unmark before touching chunks; `indexed` only holds over a full chunk set.
    store
        .update_index_status(&document.id, false, None, 0)
        .await
        .map_err(IndexError::persistence)?;
    store
        .delete_chunks(&document.id)
        .await
        .map_err(IndexError::persistence)?;

    let total = chunks.len();
    for chunk in chunks.iter_mut() {
        chunk.embedding = Some(vectorizer.transform(&chunk.text));
        if let Err(e) = store.insert_chunk(chunk).await {
            rollback(store, &document.id).await;
            return Err(IndexError::persistence(e));
        }
        run.processed_chunks += 1;
        run.emit(
            IndexStage::Embedding,
            format!("Processing chunk {}/{}", run.processed_chunks, total),
        );
    }

    let indexed_at = now_millis();
    if let Err(e) = store
        .update_index_status(&document.id, true, Some(indexed_at), total as i64)
        .await
    {
        rollback(store, &document.id).await;
        return Err(IndexError::persistence(e));
    }

    run.emit(IndexStage::Persisted, STATUS_COMPLETED);

    Ok(IndexReport {
        document_id: document.id,
        file_name: document.file_name,
        chunk_count: total,
        vocabulary_size: vectorizer.vocabulary_size(),
        indexed_at,
    })
}

async fn rollback<S: DocumentStore + ?Sized>(store: &S, document_id: &str) {
    if let Err(e) = store.delete_chunks(document_id).await {
        warn!(document = %document_id, error = %e, "failed to remove partial chunks");
    }
    if let Err(e) = store
        .update_index_status(document_id, false, None, 0)
        .await
    {
        warn!(document = %document_id, error = %e, "failed to reset index status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CorpusStats, Document, DocumentChunk};
    use crate::search::search_documents;
    use crate::store::memory::InMemoryStore;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collector(Mutex<Vec<IndexingProgress>>);

    impl IndexProgressReporter for Collector {
        fn report(&self, event: IndexingProgress) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Collector {
        fn events(&self) -> Vec<IndexingProgress> {
            self.0.lock().unwrap().clone()
        }
    }

    fn silent(_: IndexingProgress) {}

    async fn add(store: &InMemoryStore, name: &str, content: &str) -> Document {
        let doc = Document::new(name, content, "text/plain");
        store.insert_document(&doc).await.unwrap();
        doc
    }

    #[test]
    fn test_progress_serializes_stage_in_snake_case() {
        let event = IndexingProgress {
            document_id: "d1".into(),
            file_name: "a.txt".into(),
            total_chunks: 2,
            processed_chunks: 2,
            stage: IndexStage::Persisted,
            status: STATUS_COMPLETED.into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "persisted");
        assert_eq!(json["status"], "Indexing completed");
    }

    #[tokio::test]
    async fn test_index_marks_document_and_stores_chunks() {
        let store = InMemoryStore::new();
        let doc = add(&store, "a.txt", &"lorem ipsum ".repeat(100)).await;
        let progress = Collector::default();

        let report = index_document(&store, &doc.id, &IndexParams::default(), &progress)
            .await
            .unwrap();

        assert_eq!(report.chunk_count, 3);
        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert!(stored.indexed);
        assert_eq!(stored.chunk_count, 3);
        assert_eq!(stored.indexed_at, Some(report.indexed_at));

        let chunks = store.chunks_for_document(&doc.id).await.unwrap();
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            let embedding = c.embedding.as_ref().unwrap();
            assert_eq!(embedding.len(), report.vocabulary_size);
        }
    }

    #[tokio::test]
    async fn test_progress_sequence() {
        let store = InMemoryStore::new();
        let doc = add(&store, "a.txt", &"x".repeat(1200)).await;
        let progress = Collector::default();

        index_document(&store, &doc.id, &IndexParams::default(), &progress)
            .await
            .unwrap();

        let events = progress.events();
        let stages: Vec<IndexStage> = events.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                IndexStage::Pending,
                IndexStage::Chunking,
                IndexStage::Fitting,
                IndexStage::Embedding,
                IndexStage::Embedding,
                IndexStage::Embedding,
                IndexStage::Persisted,
            ]
        );
        let processed: Vec<usize> = events[3..6].iter().map(|e| e.processed_chunks).collect();
        assert_eq!(processed, vec![1, 2, 3]);
        let last = events.last().unwrap();
        assert!(last.is_terminal());
        assert_eq!(last.status, STATUS_COMPLETED);
        assert_eq!(last.total_chunks, 3);
        assert_eq!(last.file_name, "a.txt");
        assert!(events.iter().all(|e| e.document_id == doc.id));
    }

    #[tokio::test]
    async fn test_missing_document_reports_not_found() {
        let store = InMemoryStore::new();
        let progress = Collector::default();

        let err = index_document(&store, "nope", &IndexParams::default(), &progress)
            .await
            .unwrap_err();

        assert_eq!(err, IndexError::NotFound("nope".to_string()));
        let events = progress.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage, IndexStage::Failed);
        assert!(events[0].status.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_reindex_replaces_chunks() {
        let store = InMemoryStore::new();
        let doc = add(&store, "a.txt", &"alpha beta gamma ".repeat(60)).await;
        let params = IndexParams::default();

        let first = index_document(&store, &doc.id, &params, &silent)
            .await
            .unwrap();
        add(&store, "b.txt", "delta epsilon zeta").await;
        let second = index_document(&store, &doc.id, &params, &silent)
            .await
            .unwrap();

        assert_eq!(first.chunk_count, second.chunk_count);
        let chunks = store.chunks_for_document(&doc.id).await.unwrap();
        assert_eq!(chunks.len(), second.chunk_count);
    }

    #[tokio::test]
    async fn test_empty_document_indexes_with_zero_chunks() {
        let store = InMemoryStore::new();
        let doc = add(&store, "empty.txt", "").await;

        let report = index_document(&store, &doc.id, &IndexParams::default(), &silent)
            .await
            .unwrap();

        assert_eq!(report.chunk_count, 0);
        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert!(stored.indexed);
        assert_eq!(stored.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_fit_includes_existing_corpus() {
        let store = InMemoryStore::new();
        let a = add(&store, "a.txt", "rust cargo").await;
        let b = add(&store, "b.txt", "python pip").await;
        let params = IndexParams::default();

        index_document(&store, &a.id, &params, &silent).await.unwrap();
        let report = index_document(&store, &b.id, &params, &silent).await.unwrap();

        assert_eq!(report.vocabulary_size, 4);
    }

    #[tokio::test]
    async fn test_index_search_delete_scenario() {
        let store = InMemoryStore::new();
        let doc = add(
            &store,
            "fox.txt",
            "The quick brown fox jumps. The fox runs fast.",
        )
        .await;

        index_document(&store, &doc.id, &IndexParams::default(), &silent)
            .await
            .unwrap();

        let params = VectorizerParams::default();
        let results = search_documents(&store, "fox", 5, &params).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].document.id, doc.id);
        assert!(results[0].similarity > 0.0);

        store.delete_document(&doc.id).await.unwrap();
        let results = search_documents(&store, "fox", 5, &params).await.unwrap();
        assert!(results.is_empty());
    }

    /// Delegates to an in-memory store but fails the n-th chunk insert.
    /// Fails the `fail_on`th chunk insert (1-based, 0 never fails) and
    /// records `(indexed, chunk_count, stored chunks)` before every insert.
    struct FailingStore {
        inner: InMemoryStore,
        fail_on: usize,
        inserts: AtomicUsize,
        seen: Mutex<Vec<(bool, i64, usize)>>,
    }

    impl FailingStore {
        fn new(fail_on: usize) -> Self {
            Self {
                inner: InMemoryStore::new(),
                fail_on,
                inserts: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn insert_document(&self, doc: &Document) -> Result<()> {
            self.inner.insert_document(doc).await
        }
        async fn get_document(&self, id: &str) -> Result<Option<Document>> {
            self.inner.get_document(id).await
        }
        async fn get_document_by_file_name(&self, name: &str) -> Result<Option<Document>> {
            self.inner.get_document_by_file_name(name).await
        }
        async fn list_documents(&self) -> Result<Vec<Document>> {
            self.inner.list_documents().await
        }
        async fn list_chunks(&self) -> Result<Vec<DocumentChunk>> {
            self.inner.list_chunks().await
        }
        async fn chunks_for_document(&self, id: &str) -> Result<Vec<DocumentChunk>> {
            self.inner.chunks_for_document(id).await
        }
        async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
            if let Some(doc) = self.inner.get_document(&chunk.document_id).await? {
                let stored = self.inner.chunks_for_document(&doc.id).await?.len();
                self.seen
                    .lock()
                    .unwrap()
                    .push((doc.indexed, doc.chunk_count, stored));
            }
            if self.inserts.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                bail!("disk full");
            }
            self.inner.insert_chunk(chunk).await
        }
        async fn update_index_status(
            &self,
            id: &str,
            indexed: bool,
            indexed_at: Option<i64>,
            chunk_count: i64,
        ) -> Result<()> {
            self.inner
                .update_index_status(id, indexed, indexed_at, chunk_count)
                .await
        }
        async fn delete_chunks(&self, id: &str) -> Result<()> {
            self.inner.delete_chunks(id).await
        }
        async fn delete_document(&self, id: &str) -> Result<()> {
            self.inner.delete_document(id).await
        }
        async fn delete_all(&self) -> Result<()> {
            self.inner.delete_all().await
        }
        async fn stats(&self) -> Result<CorpusStats> {
            self.inner.stats().await
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back() {
        let store = FailingStore::new(2);
        let doc = Document::new("a.txt", &"word ".repeat(300), "text/plain");
        store.insert_document(&doc).await.unwrap();
        let progress = Collector::default();

        let err = index_document(&store, &doc.id, &IndexParams::default(), &progress)
            .await
            .unwrap_err();

        assert!(matches!(err, IndexError::Persistence(ref m) if m.contains("disk full")));
        assert!(store.list_chunks().await.unwrap().is_empty());
        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert!(!stored.indexed);
        let last = progress.events().pop().unwrap();
        assert_eq!(last.stage, IndexStage::Failed);
        assert_eq!(last.file_name, "a.txt");
    }

    #[tokio::test]
    async fn test_reindex_never_exposes_partial_chunks_as_indexed() {
        let store = FailingStore::new(0);
        let doc = Document::new("a.txt", &"a".repeat(1200), "text/plain");
        store.insert_document(&doc).await.unwrap();
        let params = IndexParams::default();

        index_document(&store, &doc.id, &params, &silent).await.unwrap();
        store.seen.lock().unwrap().clear();

        index_document(&store, &doc.id, &params, &silent).await.unwrap();

        let seen = store.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(false, 0, 0), (false, 0, 1), (false, 0, 2)]);
        let stored = store.get_document(&doc.id).await.unwrap().unwrap();
        assert!(stored.indexed);
        assert_eq!(stored.chunk_count, 3);
        assert_eq!(store.chunks_for_document(&doc.id).await.unwrap().len(), 3);
    }
}
