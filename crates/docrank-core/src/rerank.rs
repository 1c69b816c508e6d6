//! Heuristic reranking of ranked search results.
//!
//! Starting from each result's similarity, in input order:
//!
//! 1. **Diversity**: `+diversity_bonus` for the first chunk seen from each
//!    document; later chunks of the same document get nothing.
//! 2. **Length**: `-short_chunk_penalty` below `short_chunk_chars`,
//!    `-long_chunk_penalty` above `long_chunk_chars`, `+length_bonus`
//!    otherwise.
//! 3. **Position**: `max(0, position_horizon - chunk_index) * position_step`,
//!    i.e. 0.02 for the first chunk, fading to 0 at index 10.
//! 4. Clamp to `[0, 1]`.
//!
//! The results are then stably re-sorted by the adjusted score and ranked
//! again from 1. Reranking never adds or drops a result.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::debug;

use crate::models::SearchResult;
use crate::search::{assign_ranks, sort_by_similarity};

/// Tunable weights for [`rerank_with`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RerankWeights {
    pub diversity_bonus: f32,
    pub short_chunk_chars: usize,
    pub short_chunk_penalty: f32,
    pub long_chunk_chars: usize,
    pub long_chunk_penalty: f32,
    pub length_bonus: f32,
    pub position_step: f32,
    pub position_horizon: i64,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            diversity_bonus: 0.05,
            short_chunk_chars: 50,
            short_chunk_penalty: 0.05,
            long_chunk_chars: 1000,
            long_chunk_penalty: 0.03,
            length_bonus: 0.02,
            position_step: 0.002,
            position_horizon: 10,
        }
    }
}

impl RerankWeights {
    fn length_adjustment(&self, text: &str) -> f32 {
        let len = text.chars().count();
        if len < self.short_chunk_chars {
            -self.short_chunk_penalty
        } else if len > self.long_chunk_chars {
            -self.long_chunk_penalty
        } else {
            self.length_bonus
        }
    }

    fn position_bonus(&self, chunk_index: i64) -> f32 {
        (self.position_horizon - chunk_index).max(0) as f32 * self.position_step
    }
}

/// Rerank with the default weights.
pub fn rerank(results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
    rerank_with(results, query, &RerankWeights::default())
}

/// Rerank with explicit weights.
///
/// `query` is only logged; none of the heuristics look at it.
pub fn rerank_with(
    results: Vec<SearchResult>,
    query: &str,
    weights: &RerankWeights,
) -> Vec<SearchResult> {
    let mut seen_documents: HashSet<String> = HashSet::new();

    let mut reranked: Vec<SearchResult> = results
        .into_iter()
        .map(|mut result| {
            let original = result.similarity;
            let mut score = original;

            if seen_documents.insert(result.document.id.clone()) {
                score += weights.diversity_bonus;
            }
            score += weights.length_adjustment(&result.chunk.text);
            score += weights.position_bonus(result.chunk.chunk_index);

            result.similarity = score.clamp(0.0, 1.0);
            debug!(
                query,
                file = %result.document.file_name,
                chunk = result.chunk.chunk_index,
                original,
                reranked = result.similarity,
                "rerank"
            );
            result
        })
        .collect();

    sort_by_similarity(&mut reranked);
    assign_ranks(&mut reranked);
    reranked
}
