//! Corpus statistics.
//!
//! A quick summary of what is in the knowledge base: document and chunk
//! counts, how much of it is indexed, and a per-content-type breakdown.
//! Used by `docrank stats`.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use docrank_core::models::{format_ts_iso, now_millis, CorpusStats, Document};
use docrank_core::store::DocumentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Per-content-type document and chunk counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    pub content_type: String,
    pub documents: i64,
    pub indexed: i64,
    pub chunks: i64,
    pub last_indexed_at: Option<i64>,
}

pub fn breakdown_by_type(docs: &[Document]) -> Vec<TypeStats> {
    let mut by_type: BTreeMap<&str, TypeStats> = BTreeMap::new();
    for doc in docs {
        let entry = by_type
            .entry(doc.content_type.as_str())
            .or_insert_with(|| TypeStats {
                content_type: doc.content_type.clone(),
                ..TypeStats::default()
            });
        entry.documents += 1;
        if doc.indexed {
            entry.indexed += 1;
            entry.chunks += doc.chunk_count;
            entry.last_indexed_at = entry.last_indexed_at.max(doc.indexed_at);
        }
    }
    let mut rows: Vec<TypeStats> = by_type.into_values().collect();
    rows.sort_by(|a, b| b.documents.cmp(&a.documents));
    rows
}

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let totals: CorpusStats = store.stats().await?;
    let docs = store.list_documents().await?;
    store.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docrank — Knowledge Base Stats");
    println!("==============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!(
        "  Documents:   {} ({} indexed)",
        totals.documents, totals.indexed_documents
    );
    println!("  Chunks:      {}", totals.chunks);
    println!(
        "  Embedded:    {} / {} ({}%)",
        totals.embedded_chunks,
        totals.chunks,
        if totals.chunks > 0 {
            (totals.embedded_chunks * 100) / totals.chunks
        } else {
            0
        }
    );

    let rows = breakdown_by_type(&docs);
    if !rows.is_empty() {
        println!();
        println!("  By content type:");
        println!(
            "  {:<24} {:>6} {:>8} {:>8}   {}",
            "TYPE", "DOCS", "INDEXED", "CHUNKS", "LAST INDEXED"
        );
        println!("  {}", "-".repeat(72));

        for row in &rows {
            let indexed_display = match row.last_indexed_at {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<24} {:>6} {:>8} {:>8}   {}",
                row.content_type, row.documents, row.indexed, row.chunks, indexed_display
            );
        }
    }

    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Relative time for a Unix-millisecond timestamp (e.g. "3 hours ago").
fn format_ts_relative(ts_millis: i64) -> String {
    let delta = (now_millis() - ts_millis) / 1000;

    if delta < 0 {
        return format_ts_iso(ts_millis);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn relative_time() {
        assert_eq!(format_ts_relative(now_millis()), "just now");
        assert_eq!(format_ts_relative(now_millis() - 2 * 3600 * 1000), "2 hours ago");
    }

    #[test]
    fn breakdown_counts_only_indexed_chunks() {
        let mut a = Document::new("a.md", "x", "text/markdown");
        a.indexed = true;
        a.indexed_at = Some(10);
        a.chunk_count = 4;
        let b = Document::new("b.md", "y", "text/markdown");
        let c = Document::new("c.txt", "z", "text/plain");

        let rows = breakdown_by_type(&[a, b, c]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content_type, "text/markdown");
        assert_eq!(rows[0].documents, 2);
        assert_eq!(rows[0].indexed, 1);
        assert_eq!(rows[0].chunks, 4);
        assert_eq!(rows[0].last_indexed_at, Some(10));
        assert_eq!(rows[1].last_indexed_at, None);
    }
}
