//! Document retrieval by ID.
//!
//! Fetches a document and its chunks. Used by `docrank get`.

use anyhow::{bail, Result};
use serde::Serialize;

use docrank_core::models::format_ts_iso;
use docrank_core::store::DocumentStore;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: String, // ISO8601
    pub indexed: bool,
    pub indexed_at: Option<String>,
    pub chunk_count: i64,
    pub content: String,
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub index: i64,
    pub hash: String,
    /// Dimension of the stored embedding, if any.
    pub embedding_dims: Option<usize>,
    pub text: String,
}

/// Load a document and its chunks from any store.
pub async fn get_document<S: DocumentStore + ?Sized>(
    store: &S,
    id: &str,
) -> Result<DocumentResponse> {
    let doc = match store.get_document(id).await? {
        Some(d) => d,
        None => bail!("document not found: {}", id),
    };

    let chunks = store
        .chunks_for_document(id)
        .await?
        .into_iter()
        .map(|c| ChunkResponse {
            index: c.chunk_index,
            hash: c.hash,
            embedding_dims: c.embedding.as_ref().map(|e| e.len()),
            text: c.text,
        })
        .collect();

    Ok(DocumentResponse {
        id: doc.id,
        file_name: doc.file_name,
        content_type: doc.content_type,
        file_size: doc.file_size,
        uploaded_at: format_ts_iso(doc.uploaded_at),
        indexed: doc.indexed,
        indexed_at: doc.indexed_at.map(format_ts_iso),
        chunk_count: doc.chunk_count,
        content: doc.content,
        chunks,
    })
}

/// CLI entry point. Prints the document to stdout.
pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let result = get_document(&store, id).await;
    store.close().await;
    let doc = result?;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("file_name:    {}", doc.file_name);
    println!("content_type: {}", doc.content_type);
    println!("file_size:    {} bytes", doc.file_size);
    println!("uploaded_at:  {}", doc.uploaded_at);
    match doc.indexed_at {
        Some(ref ts) if doc.indexed => println!("indexed:      yes ({})", ts),
        _ => println!("indexed:      no"),
    }
    println!();

    println!("--- Content ---");
    println!("{}", doc.content);
    println!();

    println!("--- Chunks ({}) ---", doc.chunks.len());
    for chunk in &doc.chunks {
        match chunk.embedding_dims {
            Some(dims) => println!("[chunk {}] {} dims", chunk.index, dims),
            None => println!("[chunk {}]", chunk.index),
        }
        println!("{}", chunk.text);
        println!();
    }

    Ok(())
}
