//! Directory ingestion for project documentation.
//!
//! Walks a directory, selects files with include/exclude globs, and adds
//! each one as a document named `<prefix><relative path>`. Files whose
//! prefixed name is already in the store are skipped, so re-running an
//! ingest only picks up new files. Every added document is indexed right
//! away.
//!
//! A file that cannot be read or indexed is counted as failed and the run
//! continues with the next one.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use docrank_core::index::IndexProgressReporter;
use docrank_core::store::DocumentStore;

use crate::config::{Config, IngestConfig};
use crate::documents::guess_content_type;
use crate::progress::{IngestEvent, IngestProgressReporter, ProgressMode};
use crate::service::KnowledgeBase;
use crate::sqlite_store::SqliteStore;

/// A file selected for ingestion.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub path: PathBuf,
    /// Path relative to the ingest root, `/`-separated.
    pub relative_path: String,
    pub content_type: &'static str,
}

/// Counts from one ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub found: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// List the files under `root` that the globs select, sorted by path.
pub fn scan_directory(root: &Path, config: &IngestConfig) -> Result<Vec<ProjectFile>> {
    if !root.is_dir() {
        bail!("Ingest root is not a directory: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(ProjectFile {
            path: path.to_path_buf(),
            content_type: guess_content_type(path),
            relative_path: rel_str,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Add and index every new file under `root`.
pub async fn ingest_directory<S: DocumentStore + 'static>(
    kb: &KnowledgeBase<S>,
    root: &Path,
    config: &IngestConfig,
    reporter: &dyn IngestProgressReporter,
    index_reporter: &dyn IndexProgressReporter,
) -> Result<IngestReport> {
    reporter.report(IngestEvent::Scanning {
        root: root.display().to_string(),
    });
    let files = scan_directory(root, config)?;

    let mut report = IngestReport {
        found: files.len(),
        ..IngestReport::default()
    };
    if !files.is_empty() {
        reporter.report(IngestEvent::Found { total: files.len() });
    }

    for (i, file) in files.iter().enumerate() {
        reporter.report(IngestEvent::Indexing {
            n: i + 1,
            total: files.len(),
            file_name: file.relative_path.clone(),
        });

        let file_name = format!("{}{}", config.file_name_prefix, file.relative_path);
        match kb.get_document_by_file_name(&file_name).await {
            Ok(Some(_)) => {
                debug!(file = %file.relative_path, "already ingested, skipping");
                report.skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(file = %file.relative_path, error = %e, "failed to look up file");
                report.failed += 1;
                continue;
            }
        }

        let content = match std::fs::read_to_string(&file.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "failed to read file");
                report.failed += 1;
                continue;
            }
        };

        let doc = match kb.add_document(&file_name, &content, file.content_type).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file = %file.relative_path, error = %e, "failed to add file");
                report.failed += 1;
                continue;
            }
        };
        match kb.index_document(&doc.id).forward_to(index_reporter).await {
            Ok(_) => report.indexed += 1,
            Err(e) => {
                warn!(file = %file.relative_path, error = %e, "failed to index file");
                report.failed += 1;
            }
        }
    }

    reporter.report(IngestEvent::Completed {
        indexed: report.indexed,
        skipped: report.skipped,
        failed: report.failed,
    });
    Ok(report)
}

/// CLI entry point for `docrank ingest`.
pub async fn run_ingest(config: &Config, root: &Path, progress: ProgressMode) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let kb = KnowledgeBase::from_config(std::sync::Arc::new(store), config);

    let reporter = progress.ingest_reporter();
    let index_reporter = progress.index_reporter();
    let report = ingest_directory(
        &kb,
        root,
        &config.ingest,
        reporter.as_ref(),
        index_reporter.as_ref(),
    )
    .await?;

    println!("ingest {}", root.display());
    println!("  files found: {}", report.found);
    println!("  indexed: {}", report.indexed);
    println!("  skipped: {}", report.skipped);
    println!("  failed: {}", report.failed);
    println!("ok");

    kb.store().close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};

    use docrank_core::index::IndexParams;
    use docrank_core::search::RetrievalOptions;
    use docrank_core::store::memory::InMemoryStore;
    use tempfile::TempDir;

    use anyhow::bail;
    use async_trait::async_trait;
    use docrank_core::models::{CorpusStats, Document, DocumentChunk};

    use crate::progress::NoProgress;

    #[derive(Default)]
    struct Events(Mutex<Vec<IngestEvent>>);

    impl IngestProgressReporter for Events {
        fn report(&self, event: IngestEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn project_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("README.md"), "# Readme\n\nBuild with cargo build.").unwrap();
        fs::write(root.join("docs/guide.txt"), "Deployment guide for docker.").unwrap();
        fs::write(root.join("docs/notes.rs"), "fn main() {}").unwrap();
        fs::write(root.join("target/out.md"), "generated").unwrap();
        tmp
    }

    fn kb() -> KnowledgeBase<InMemoryStore> {
        KnowledgeBase::new(
            Arc::new(InMemoryStore::new()),
            IndexParams::default(),
            RetrievalOptions::default(),
        )
    }

    #[test]
    fn scan_applies_globs_and_default_excludes() {
        let tmp = project_dir();
        let files = scan_directory(tmp.path(), &IngestConfig::default()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(names, vec!["README.md", "docs/guide.txt"]);
        assert_eq!(files[0].content_type, "text/markdown");
        assert_eq!(files[1].content_type, "text/plain");
    }

    #[test]
    fn scan_rejects_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(scan_directory(&tmp.path().join("nope"), &IngestConfig::default()).is_err());
    }

    #[tokio::test]
    async fn ingest_adds_prefixed_documents_and_skips_existing() {
        let tmp = project_dir();
        let kb = kb();
        let config = IngestConfig::default();

        let events = Events::default();
        let first = ingest_directory(&kb, tmp.path(), &config, &events, &NoProgress)
            .await
            .unwrap();
        assert_eq!(
            first,
            IngestReport {
                found: 2,
                indexed: 2,
                skipped: 0,
                failed: 0,
            }
        );
        let doc = kb
            .get_document_by_file_name("PROJECT_DOC_README.md")
            .await
            .unwrap()
            .unwrap();
        assert!(doc.indexed);
        assert_eq!(doc.content_type, "text/markdown");

        let recorded = events.0.lock().unwrap().clone();
        assert!(matches!(recorded[0], IngestEvent::Scanning { .. }));
        assert_eq!(recorded[1], IngestEvent::Found { total: 2 });
        assert_eq!(
            recorded.last(),
            Some(&IngestEvent::Completed {
                indexed: 2,
                skipped: 0,
                failed: 0,
            })
        );

        let second = ingest_directory(&kb, tmp.path(), &config, &NoProgress, &NoProgress)
            .await
            .unwrap();
        assert_eq!(second.indexed, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(kb.stats().await.unwrap().documents, 2);
    }

    #[tokio::test]
    async fn ingested_docs_are_searchable() {
        let tmp = project_dir();
        let kb = kb();
        ingest_directory(
            &kb,
            tmp.path(),
            &IngestConfig::default(),
            &NoProgress,
            &NoProgress,
        )
        .await
        .unwrap();

        let results = kb.search_documents("docker deployment", 3).await.unwrap();
        assert_eq!(results[0].document.file_name, "PROJECT_DOC_docs/guide.txt");
    }

    /// Fails lookups of names containing `README` and inserts of names
    /// containing `guide`.
    struct FlakyStore(InMemoryStore);

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn insert_document(&self, doc: &Document) -> Result<()> {
            if doc.file_name.contains("guide") {
                bail!("database is locked");
            }
            self.0.insert_document(doc).await
        }
        async fn get_document(&self, id: &str) -> Result<Option<Document>> {
            self.0.get_document(id).await
        }
        async fn get_document_by_file_name(&self, name: &str) -> Result<Option<Document>> {
            if name.contains("README") {
                bail!("database is locked");
            }
            self.0.get_document_by_file_name(name).await
        }
        async fn list_documents(&self) -> Result<Vec<Document>> {
            self.0.list_documents().await
        }
        async fn list_chunks(&self) -> Result<Vec<DocumentChunk>> {
            self.0.list_chunks().await
        }
        async fn chunks_for_document(&self, id: &str) -> Result<Vec<DocumentChunk>> {
            self.0.chunks_for_document(id).await
        }
        async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
            self.0.insert_chunk(chunk).await
        }
        async fn update_index_status(
            &self,
            id: &str,
            indexed: bool,
            indexed_at: Option<i64>,
            chunk_count: i64,
        ) -> Result<()> {
            self.0
                .update_index_status(id, indexed, indexed_at, chunk_count)
                .await
        }
        async fn delete_chunks(&self, id: &str) -> Result<()> {
            self.0.delete_chunks(id).await
        }
        async fn delete_document(&self, id: &str) -> Result<()> {
            self.0.delete_document(id).await
        }
        async fn delete_all(&self) -> Result<()> {
            self.0.delete_all().await
        }
        async fn stats(&self) -> Result<CorpusStats> {
            self.0.stats().await
        }
    }

    #[tokio::test]
    async fn store_errors_count_as_failed_and_the_run_continues() {
        let tmp = project_dir();
        fs::write(tmp.path().join("docs/extra.md"), "Extra notes on tracing.").unwrap();
        let kb = KnowledgeBase::new(
            Arc::new(FlakyStore(InMemoryStore::new())),
            IndexParams::default(),
            RetrievalOptions::default(),
        );

        let events = Events::default();
        let report = ingest_directory(
            &kb,
            tmp.path(),
            &IngestConfig::default(),
            &events,
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            IngestReport {
                found: 3,
                indexed: 1,
                skipped: 0,
                failed: 2,
            }
        );
        assert!(kb
            .get_document_by_file_name("PROJECT_DOC_docs/extra.md")
            .await
            .unwrap()
            .is_some());
        assert_eq!(
            events.0.lock().unwrap().last(),
            Some(&IngestEvent::Completed {
                indexed: 1,
                skipped: 0,
                failed: 2,
            })
        );
    }
}
