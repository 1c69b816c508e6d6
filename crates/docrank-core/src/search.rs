//! Query orchestration, cosine ranking, and threshold filtering.
//!
//! [`search_documents`] is the read side of the engine. It works entirely
//! through the [`DocumentStore`] trait and fits its own [`Vectorizer`] for
//! every call, so concurrent queries never share model state.
//!
//! # Query algorithm
//!
//! 1. Load every chunk in the corpus. None → empty result.
//! 2. Fit a fresh vectorizer over all chunk texts.
//! 3. Transform the query.
//! 4. Transform every chunk again with the same model. Stored embeddings
//!    come from older fits and are never compared here.
//! 5. [`rank`]: cosine similarity, stable sort descending, top-K, ranks 1..K.
//!
//! [`retrieve`] layers the caller-side steps on top: oversampled search,
//! [`filter_by_similarity`], optional [`rerank`](crate::rerank::rerank_with),
//! and a final top-K cut.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::embedding::cosine_similarity;
use crate::error::SearchError;
use crate::models::{Document, DocumentChunk, SearchResult};
use crate::rerank::{rerank_with, RerankWeights};
use crate::store::DocumentStore;
use crate::vectorizer::{Vectorizer, VectorizerParams};

/// One chunk to be scored, with the vector produced for it in this operation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
    pub document: Document,
}

/// Score every candidate against `query_vec` and keep the best `top_k`.
///
/// Sorting is stable: equal scores keep their input order. Ranks are
/// assigned `1..=n` in sorted order.
pub fn rank(query_vec: &[f32], candidates: Vec<Candidate>, top_k: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .map(|c| SearchResult {
            similarity: cosine_similarity(query_vec, &c.vector),
            chunk: c.chunk,
            document: c.document,
            rank: 0,
        })
        .collect();

    sort_by_similarity(&mut results);
    results.truncate(top_k);
    assign_ranks(&mut results);
    results
}

/// Keep only results with `similarity >= threshold`, preserving order.
///
/// A threshold of `0.0` keeps everything. An empty output means "nothing
/// relevant", not an error.
pub fn filter_by_similarity(results: Vec<SearchResult>, threshold: f32) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| {
            let keep = r.similarity >= threshold;
            if !keep {
                debug!(
                    similarity = r.similarity,
                    threshold,
                    file = %r.document.file_name,
                    "filtered below threshold"
                );
            }
            keep
        })
        .collect()
}

/// Run a query over the whole corpus.
///
/// Returns an empty list when the corpus has no chunks or `top_k` is zero.
/// Chunks whose document can no longer be loaded are skipped.
pub async fn search_documents<S: DocumentStore + ?Sized>(
    store: &S,
    query: &str,
    top_k: usize,
    params: &VectorizerParams,
) -> Result<Vec<SearchResult>, SearchError> {
    let chunks = store.list_chunks().await.map_err(SearchError::store)?;
    if chunks.is_empty() || top_k == 0 {
        debug!("no indexed chunks, returning empty result");
        return Ok(Vec::new());
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectorizer = Vectorizer::fitted(params.clone(), &texts);
    let query_vec = vectorizer.transform(query);

    let mut documents: HashMap<String, Option<Document>> = HashMap::new();
    let mut candidates = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if !documents.contains_key(&chunk.document_id) {
            let doc = store
                .get_document(&chunk.document_id)
                .await
                .map_err(SearchError::store)?;
            documents.insert(chunk.document_id.clone(), doc);
        }
        let Some(Some(document)) = documents.get(&chunk.document_id) else {
            warn!(chunk = %chunk.id, document = %chunk.document_id, "chunk without document, skipping");
            continue;
        };
        let vector = vectorizer.transform(&chunk.text);
        candidates.push(Candidate {
            document: document.clone(),
            chunk,
            vector,
        });
    }

    let total = candidates.len();
    let results = rank(&query_vec, candidates, top_k);
    debug!(
        query,
        vocabulary = vectorizer.vocabulary_size(),
        candidates = total,
        returned = results.len(),
        "search completed"
    );
    for r in &results {
        debug!(
            rank = r.rank,
            similarity = r.similarity,
            file = %r.document.file_name,
            chunk = r.chunk.chunk_index,
            "ranked chunk"
        );
    }
    Ok(results)
}

/// Caller-side retrieval settings.
#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    /// Results returned after filtering and reranking.
    pub top_k: usize,
    /// Minimum similarity kept by the threshold filter.
    pub similarity_threshold: f32,
    /// Search `top_k * oversample` candidates before filtering.
    pub oversample: usize,
    /// Rerank with these weights; `None` skips reranking.
    pub rerank: Option<RerankWeights>,
    pub vectorizer: VectorizerParams,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.0,
            oversample: 2,
            rerank: None,
            vectorizer: VectorizerParams::default(),
        }
    }
}

/// Outcome of [`retrieve`], with counts for each stage.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    /// Results returned by the oversampled search.
    pub found: usize,
    /// Results left after the threshold filter.
    pub after_filter: usize,
    pub reranked: bool,
    pub results: Vec<SearchResult>,
}

/// Search, filter, optionally rerank, then keep the best `top_k`.
pub async fn retrieve<S: DocumentStore + ?Sized>(
    store: &S,
    query: &str,
    options: &RetrievalOptions,
) -> Result<Retrieval, SearchError> {
    let candidate_k = options.top_k.saturating_mul(options.oversample.max(1));
    let raw = search_documents(store, query, candidate_k, &options.vectorizer).await?;
    let found = raw.len();

    let filtered = filter_by_similarity(raw, options.similarity_threshold);
    let after_filter = filtered.len();

    let mut results = match &options.rerank {
        Some(weights) => rerank_with(filtered, query, weights),
        None => filtered,
    };
    results.truncate(options.top_k);
    assign_ranks(&mut results);

    Ok(Retrieval {
        found,
        after_filter,
        reranked: options.rerank.is_some(),
        results,
    })
}

/// Stable sort, highest similarity first.
pub(crate) fn sort_by_similarity(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

pub(crate) fn assign_ranks(results: &mut [SearchResult]) {
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{chunk_text, ChunkParams};
    use crate::store::memory::InMemoryStore;

    fn make_candidate(doc: &Document, index: i64, vector: Vec<f32>) -> Candidate {
        let mut chunk = chunk_text(&doc.id, "text", &ChunkParams::default()).remove(0);
        chunk.chunk_index = index;
        Candidate {
            chunk,
            vector,
            document: doc.clone(),
        }
    }

    fn make_result(doc_id: &str, similarity: f32) -> SearchResult {
        let mut document = Document::new("f.txt", "text", "text/plain");
        document.id = doc_id.to_string();
        let chunk = chunk_text(doc_id, "text", &ChunkParams::default()).remove(0);
        SearchResult {
            chunk,
            document,
            similarity,
            rank: 0,
        }
    }

    async fn add_chunks(store: &InMemoryStore, name: &str, text: &str) -> Document {
        let doc = Document::new(name, text, "text/plain");
        store.insert_document(&doc).await.unwrap();
        for c in chunk_text(&doc.id, text, &ChunkParams::default()) {
            store.insert_chunk(&c).await.unwrap();
        }
        doc
    }

    #[test]
    fn test_rank_sorted_with_contiguous_ranks() {
        let doc = Document::new("a.txt", "x", "text/plain");
        let candidates = vec![
            make_candidate(&doc, 0, vec![0.0, 1.0]),
            make_candidate(&doc, 1, vec![1.0, 0.0]),
            make_candidate(&doc, 2, vec![1.0, 1.0]),
        ];
        let results = rank(&[1.0, 0.0], candidates, 10);
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(results[0].chunk.chunk_index, 1);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let doc = Document::new("a.txt", "x", "text/plain");
        let candidates = (0..4)
            .map(|i| make_candidate(&doc, i, vec![1.0, 0.0]))
            .collect();
        let results = rank(&[1.0, 0.0], candidates, 3);
        let order: Vec<i64> = results.iter().map(|r| r.chunk.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_rank_empty_query_vector_scores_zero() {
        let doc = Document::new("a.txt", "x", "text/plain");
        let results = rank(&[], vec![make_candidate(&doc, 0, vec![1.0])], 5);
        assert_eq!(results[0].similarity, 0.0);
        assert_eq!(results[0].rank, 1);
    }

    #[test]
    fn test_filter_by_similarity() {
        let results = vec![
            make_result("d1", 0.9),
            make_result("d2", 0.2),
            make_result("d3", 0.5),
        ];
        let kept = filter_by_similarity(results.clone(), 0.5);
        let scores: Vec<f32> = kept.iter().map(|r| r.similarity).collect();
        assert_eq!(scores, vec![0.9, 0.5]);

        assert_eq!(filter_by_similarity(results.clone(), 0.0), results);
        assert!(filter_by_similarity(results, 0.95).is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_corpus() {
        let store = InMemoryStore::new();
        let results = search_documents(&store, "anything", 5, &VectorizerParams::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_identical_chunk_ranks_first() {
        let store = InMemoryStore::new();
        let unrelated = add_chunks(&store, "a.txt", "completely different words here").await;
        let matching = add_chunks(&store, "b.txt", "rust ownership borrowing").await;

        let results = search_documents(
            &store,
            "rust ownership borrowing",
            5,
            &VectorizerParams::default(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, matching.id);
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
        assert_eq!(results[1].document.id, unrelated.id);
        assert!(results[1].similarity < results[0].similarity);
    }

    #[tokio::test]
    async fn test_search_top_k_truncates() {
        let store = InMemoryStore::new();
        for i in 0..4 {
            add_chunks(&store, &format!("{}.txt", i), "shared words everywhere").await;
        }
        let results = search_documents(&store, "shared", 2, &VectorizerParams::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].rank, 2);
    }

    #[tokio::test]
    async fn test_retrieve_filters_and_caps() {
        let store = InMemoryStore::new();
        add_chunks(&store, "fox.txt", "fox jumps over fences").await;
        add_chunks(&store, "cat.txt", "cat sleeps all day").await;
        add_chunks(&store, "dog.txt", "dog barks at fox").await;

        let options = RetrievalOptions {
            top_k: 1,
            similarity_threshold: 0.01,
            ..Default::default()
        };
        let retrieval = retrieve(&store, "fox", &options).await.unwrap();
        assert_eq!(retrieval.found, 2);
        assert_eq!(retrieval.after_filter, 2);
        assert!(!retrieval.reranked);
        assert_eq!(retrieval.results.len(), 1);
        assert_eq!(retrieval.results[0].rank, 1);
        assert!(retrieval.results[0].similarity > 0.0);
    }

    #[tokio::test]
    async fn test_retrieve_with_rerank_keeps_candidates() {
        let store = InMemoryStore::new();
        add_chunks(&store, "fox.txt", "fox jumps over fences").await;
        add_chunks(&store, "dog.txt", "dog barks at fox").await;

        let options = RetrievalOptions {
            top_k: 5,
            rerank: Some(RerankWeights::default()),
            ..Default::default()
        };
        let retrieval = retrieve(&store, "fox", &options).await.unwrap();
        assert!(retrieval.reranked);
        assert_eq!(retrieval.results.len(), 2);
        let ranks: Vec<usize> = retrieval.results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }
}
