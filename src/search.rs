//! `docrank search`, `docrank context`, and `docrank docs`.
//!
//! All three run the retrieval pipeline (oversampled search, threshold
//! filter, optional rerank, top-K) and differ only in how they print.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use docrank_core::models::SearchResult;
use docrank_core::search::RetrievalOptions;

use crate::config::Config;
use crate::context::{build_context, grounded_prompt, render_project_docs};
use crate::service::KnowledgeBase;
use crate::sqlite_store::SqliteStore;

/// Command-line overrides of the `[retrieval]` table.
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub rerank: bool,
}

impl SearchOverrides {
    pub fn apply(&self, config: &Config) -> Result<RetrievalOptions> {
        let mut options = config.retrieval_options();
        if let Some(k) = self.top_k {
            options.top_k = k;
        }
        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                anyhow::bail!("--threshold must be in [0.0, 1.0]");
            }
            options.similarity_threshold = t;
        }
        if self.rerank {
            options.rerank = Some(config.rerank.clone());
        }
        Ok(options)
    }
}

/// One search hit as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub similarity: f32,
    pub document_id: String,
    pub file_name: String,
    pub chunk_index: i64,
    pub text: String,
}

impl From<&SearchResult> for SearchHit {
    fn from(r: &SearchResult) -> Self {
        Self {
            rank: r.rank,
            similarity: r.similarity,
            document_id: r.document.id.clone(),
            file_name: r.document.file_name.clone(),
            chunk_index: r.chunk.chunk_index,
            text: r.chunk.text.clone(),
        }
    }
}

async fn open(config: &Config) -> Result<KnowledgeBase<SqliteStore>> {
    let store = SqliteStore::open(config).await?;
    Ok(KnowledgeBase::from_config(Arc::new(store), config))
}

pub async fn run_search(
    config: &Config,
    query: &str,
    overrides: &SearchOverrides,
    json: bool,
) -> Result<()> {
    let options = overrides.apply(config)?;
    let kb = open(config).await?;
    let retrieval = kb.retrieve_with(query, &options).await?;
    kb.store().close().await;

    if json {
        let hits: Vec<SearchHit> = retrieval.results.iter().map(SearchHit::from).collect();
        let out = serde_json::json!({
            "query": query,
            "found": retrieval.found,
            "after_filter": retrieval.after_filter,
            "reranked": retrieval.reranked,
            "results": hits,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if retrieval.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for r in &retrieval.results {
        println!(
            "{}. [{:.4}] {} (chunk {})",
            r.rank, r.similarity, r.document.file_name, r.chunk.chunk_index
        );
        println!("    document: {}", r.document.id);
        println!("    {}", snippet(&r.chunk.text, 200));
        println!();
    }
    println!(
        "{} found, {} above threshold{}",
        retrieval.found,
        retrieval.after_filter,
        if retrieval.reranked { ", reranked" } else { "" }
    );
    Ok(())
}

/// Print the grounded prompt for `question`.
pub async fn run_context(config: &Config, question: &str, overrides: &SearchOverrides) -> Result<()> {
    let options = overrides.apply(config)?;
    let kb = open(config).await?;
    let retrieval = kb.retrieve_with(question, &options).await?;
    kb.store().close().await;

    let context = build_context(&retrieval.results);
    println!("{}", grounded_prompt(&context, question));
    Ok(())
}

/// Search restricted to ingested project documentation.
pub async fn run_docs(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let kb = open(config).await?;
    let results = kb
        .search_documents(query, top_k.unwrap_or(3))
        .await?;
    kb.store().close().await;

    match render_project_docs(query, &results, &config.ingest.file_name_prefix) {
        Some(out) => print!("{}", out),
        None => println!("No documentation found for: \"{}\"", query),
    }
    Ok(())
}

/// First `max_chars` characters of `text` on one line.
fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_flattens_and_truncates() {
        assert_eq!(snippet("a\nb", 10), "a b");
        assert_eq!(snippet("abcdef", 3), "abc...");
    }

    #[test]
    fn overrides_replace_config_values() {
        let config = Config::with_db_path("x.sqlite");
        let overrides = SearchOverrides {
            top_k: Some(3),
            threshold: Some(0.25),
            rerank: true,
        };
        let options = overrides.apply(&config).unwrap();
        assert_eq!(options.top_k, 3);
        assert!((options.similarity_threshold - 0.25).abs() < f32::EPSILON);
        assert!(options.rerank.is_some());
    }

    #[test]
    fn overrides_reject_bad_threshold() {
        let config = Config::with_db_path("x.sqlite");
        let overrides = SearchOverrides {
            threshold: Some(2.0),
            ..SearchOverrides::default()
        };
        assert!(overrides.apply(&config).is_err());
    }
}
