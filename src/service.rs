//! The [`KnowledgeBase`] facade.
//!
//! Binds a [`DocumentStore`] to the configured chunking, vectorizer, and
//! retrieval settings and exposes the operations callers use: add, index,
//! search, filter, rerank, retrieve, and the bookkeeping around them.
//!
//! Indexing and queries each run as their own tokio task with their own
//! vectorizer, so any number of them may be in flight at once. Indexing
//! progress is delivered through an unbounded channel held by the returned
//! [`IndexingHandle`]; the embedding loop never waits on the consumer.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::info;

use docrank_core::error::{IndexError, SearchError};
use docrank_core::index::{
    self, IndexParams, IndexProgressReporter, IndexReport, IndexingProgress,
};
use docrank_core::models::{CorpusStats, Document, DocumentChunk, SearchResult};
use docrank_core::rerank::{rerank_with, RerankWeights};
use docrank_core::search::{self, Retrieval, RetrievalOptions};
use docrank_core::store::DocumentStore;

use crate::config::Config;
use crate::progress::ChannelProgress;

/// A running indexing operation.
pub struct IndexingHandle {
    /// Ordered progress events; closes when the run ends.
    pub progress: UnboundedReceiver<IndexingProgress>,
    outcome: JoinHandle<Result<IndexReport, IndexError>>,
}

impl IndexingHandle {
    /// Wait for the run to finish, discarding progress.
    pub async fn wait(self) -> Result<IndexReport, IndexError> {
        join_outcome(self.outcome).await
    }

    /// Relay every progress event to `reporter`, then return the outcome.
    pub async fn forward_to(
        mut self,
        reporter: &dyn IndexProgressReporter,
    ) -> Result<IndexReport, IndexError> {
        while let Some(event) = self.progress.recv().await {
            reporter.report(event);
        }
        join_outcome(self.outcome).await
    }
}

async fn join_outcome(
    handle: JoinHandle<Result<IndexReport, IndexError>>,
) -> Result<IndexReport, IndexError> {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => Err(IndexError::Unexpected(format!("indexing task failed: {}", e))),
    }
}

/// A knowledge base over one store.
pub struct KnowledgeBase<S: DocumentStore + 'static> {
    store: Arc<S>,
    index_params: IndexParams,
    retrieval: RetrievalOptions,
    rerank_weights: RerankWeights,
}

impl<S: DocumentStore + 'static> Clone for KnowledgeBase<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index_params: self.index_params.clone(),
            retrieval: self.retrieval.clone(),
            rerank_weights: self.rerank_weights.clone(),
        }
    }
}

impl<S: DocumentStore + 'static> KnowledgeBase<S> {
    pub fn new(store: Arc<S>, index_params: IndexParams, retrieval: RetrievalOptions) -> Self {
        let rerank_weights = retrieval.rerank.clone().unwrap_or_default();
        Self {
            store,
            index_params,
            retrieval,
            rerank_weights,
        }
    }

    pub fn from_config(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            index_params: config.index_params(),
            retrieval: config.retrieval_options(),
            rerank_weights: config.rerank.clone(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Retrieval defaults from config; callers copy and adjust per query.
    pub fn retrieval_options(&self) -> &RetrievalOptions {
        &self.retrieval
    }

    pub fn rerank_weights(&self) -> &RerankWeights {
        &self.rerank_weights
    }

    /// Store a new, not-yet-indexed document.
    pub async fn add_document(
        &self,
        file_name: &str,
        content: &str,
        content_type: &str,
    ) -> Result<Document> {
        let doc = Document::new(file_name, content, content_type);
        self.store
            .insert_document(&doc)
            .await
            .with_context(|| format!("Failed to add document: {}", file_name))?;
        info!(document = %doc.id, file = %doc.file_name, bytes = doc.file_size, "document added");
        Ok(doc)
    }

    /// Start indexing a document on its own task.
    pub fn index_document(&self, document_id: &str) -> IndexingHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Arc::clone(&self.store);
        let params = self.index_params.clone();
        let document_id = document_id.to_string();

        let outcome = tokio::spawn(async move {
            let reporter = ChannelProgress::new(tx);
            index::index_document(store.as_ref(), &document_id, &params, &reporter).await
        });

        IndexingHandle {
            progress: rx,
            outcome,
        }
    }

    /// Rank the whole corpus against `query` on its own task.
    pub async fn search_documents(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let store = Arc::clone(&self.store);
        let params = self.retrieval.vectorizer.clone();
        let query = query.to_string();

        tokio::spawn(async move {
            search::search_documents(store.as_ref(), &query, top_k, &params).await
        })
        .await
        .map_err(|e| SearchError::Task(e.to_string()))?
    }

    pub fn filter_by_similarity(
        &self,
        results: Vec<SearchResult>,
        threshold: f32,
    ) -> Vec<SearchResult> {
        search::filter_by_similarity(results, threshold)
    }

    /// Rerank with the configured weights.
    pub fn rerank(&self, results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
        rerank_with(results, query, &self.rerank_weights)
    }

    /// Search, filter, optionally rerank, and cut to `top_k`, using the
    /// configured retrieval options.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval, SearchError> {
        self.retrieve_with(query, &self.retrieval).await
    }

    pub async fn retrieve_with(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<Retrieval, SearchError> {
        let store = Arc::clone(&self.store);
        let options = options.clone();
        let query = query.to_string();

        tokio::spawn(async move { search::retrieve(store.as_ref(), &query, &options).await })
            .await
            .map_err(|e| SearchError::Task(e.to_string()))?
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        self.store.get_document(id).await
    }

    pub async fn get_document_by_file_name(&self, file_name: &str) -> Result<Option<Document>> {
        self.store.get_document_by_file_name(file_name).await
    }

    /// All documents, newest first.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.store.list_documents().await
    }

    pub async fn list_indexed_documents(&self) -> Result<Vec<Document>> {
        let docs = self.store.list_documents().await?;
        Ok(docs.into_iter().filter(|d| d.indexed).collect())
    }

    /// Documents not yet indexed, oldest first.
    pub async fn list_pending_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .store
            .list_documents()
            .await?
            .into_iter()
            .filter(|d| !d.indexed)
            .collect();
        docs.reverse();
        Ok(docs)
    }

    pub async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        self.store.chunks_for_document(document_id).await
    }

    /// Delete a document and its chunks. Returns false if it did not exist.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        if self.store.get_document(id).await?.is_none() {
            return Ok(false);
        }
        self.store.delete_document(id).await?;
        info!(document = %id, "document deleted");
        Ok(true)
    }

    pub async fn delete_all_documents(&self) -> Result<()> {
        self.store.delete_all().await?;
        info!("all documents deleted");
        Ok(())
    }

    pub async fn stats(&self) -> Result<CorpusStats> {
        self.store.stats().await
    }
}
