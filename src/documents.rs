//! `docrank add`, `index`, `list`, and `delete`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use docrank_core::models::format_ts_iso;

use crate::config::Config;
use crate::progress::ProgressMode;
use crate::service::KnowledgeBase;
use crate::sqlite_store::SqliteStore;

async fn open(config: &Config) -> Result<KnowledgeBase<SqliteStore>> {
    let store = SqliteStore::open(config).await?;
    Ok(KnowledgeBase::from_config(Arc::new(store), config))
}

/// Content type guessed from the file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => "text/markdown",
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

pub async fn run_add(
    config: &Config,
    path: &Path,
    content_type: Option<String>,
    index: bool,
    progress: ProgressMode,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path).to_string());

    let kb = open(config).await?;
    let doc = kb.add_document(&file_name, &content, &content_type).await?;
    println!("added {} ({})", doc.id, doc.file_name);

    if index {
        let reporter = progress.index_reporter();
        let report = kb
            .index_document(&doc.id)
            .forward_to(reporter.as_ref())
            .await?;
        println!("indexed {} chunks", report.chunk_count);
    }

    kb.store().close().await;
    Ok(())
}

/// Index one document, or every pending one.
pub async fn run_index(
    config: &Config,
    id: Option<String>,
    pending: bool,
    progress: ProgressMode,
) -> Result<()> {
    let kb = open(config).await?;

    let ids: Vec<String> = match (id, pending) {
        (Some(id), false) => vec![id],
        (None, true) => kb
            .list_pending_documents()
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect(),
        _ => bail!("specify exactly one of <id> or --pending"),
    };

    if ids.is_empty() {
        println!("Nothing to index.");
        kb.store().close().await;
        return Ok(());
    }

    let reporter = progress.index_reporter();
    let mut failed = 0usize;
    for id in &ids {
        match kb.index_document(id).forward_to(reporter.as_ref()).await {
            Ok(report) => println!(
                "indexed {} ({}): {} chunks",
                report.document_id, report.file_name, report.chunk_count
            ),
            Err(e) => {
                eprintln!("Error: {}: {}", id, e);
                failed += 1;
            }
        }
    }

    kb.store().close().await;
    if failed > 0 {
        bail!("{} of {} documents failed to index", failed, ids.len());
    }
    Ok(())
}

pub async fn run_list(config: &Config, indexed_only: bool) -> Result<()> {
    let kb = open(config).await?;
    let docs = if indexed_only {
        kb.list_indexed_documents().await?
    } else {
        kb.list_documents().await?
    };
    kb.store().close().await;

    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<8} {:>6}  {:<20}  {}",
        "ID", "INDEXED", "CHUNKS", "UPLOADED", "FILE"
    );
    for doc in &docs {
        println!(
            "{:<36}  {:<8} {:>6}  {:<20}  {}",
            doc.id,
            if doc.indexed { "yes" } else { "no" },
            doc.chunk_count,
            format_ts_iso(doc.uploaded_at),
            doc.file_name
        );
    }
    Ok(())
}

pub async fn run_delete(config: &Config, id: Option<String>, all: bool) -> Result<()> {
    let kb = open(config).await?;
    let result = match (id, all) {
        (Some(id), false) => match kb.delete_document(&id).await {
            Ok(true) => {
                println!("deleted {}", id);
                Ok(())
            }
            Ok(false) => Err(anyhow::anyhow!("document not found: {}", id)),
            Err(e) => Err(e),
        },
        (None, true) => kb.delete_all_documents().await.map(|_| {
            println!("deleted all documents");
        }),
        _ => Err(anyhow::anyhow!("specify exactly one of <id> or --all")),
    };
    kb.store().close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(guess_content_type(Path::new("a/README.md")), "text/markdown");
        assert_eq!(guess_content_type(Path::new("data.json")), "application/json");
        assert_eq!(guess_content_type(Path::new("notes")), "text/plain");
    }
}
