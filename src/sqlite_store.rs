//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Documents and chunks live in two tables (see [`crate::migrate`]).
//! Embeddings are stored inline on the chunk row as little-endian `f32`
//! BLOBs. Multi-statement deletes run in one transaction.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docrank_core::embedding::{blob_to_vec, vec_to_blob};
use docrank_core::models::{CorpusStats, Document, DocumentChunk};
use docrank_core::store::DocumentStore;

use crate::config::Config;
use crate::{db, migrate};

const DOCUMENT_COLUMNS: &str = "id, file_name, content, content_type, file_size, uploaded_at, \
                                indexed, indexed_at, chunk_count";

const CHUNK_COLUMNS: &str = "id, document_id, chunk_index, text, hash, embedding, created_at";

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_document(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        file_name: row.get("file_name"),
        content: row.get("content"),
        content_type: row.get("content_type"),
        file_size: row.get("file_size"),
        uploaded_at: row.get("uploaded_at"),
        indexed: row.get("indexed"),
        indexed_at: row.get("indexed_at"),
        chunk_count: row.get("chunk_count"),
    }
}

fn row_to_chunk(row: &SqliteRow) -> DocumentChunk {
    let blob: Option<Vec<u8>> = row.get("embedding");
    DocumentChunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        chunk_index: row.get("chunk_index"),
        text: row.get("text"),
        hash: row.get("hash"),
        embedding: blob.map(|b| blob_to_vec(&b)),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, file_name, content, content_type, file_size,
                                   uploaded_at, indexed, indexed_at, chunk_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                file_name = excluded.file_name,
                content = excluded.content,
                content_type = excluded.content_type,
                file_size = excluded.file_size,
                uploaded_at = excluded.uploaded_at,
                indexed = excluded.indexed,
                indexed_at = excluded.indexed_at,
                chunk_count = excluded.chunk_count
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.file_name)
        .bind(&doc.content)
        .bind(&doc.content_type)
        .bind(doc.file_size)
        .bind(doc.uploaded_at)
        .bind(doc.indexed)
        .bind(doc.indexed_at)
        .bind(doc.chunk_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let sql = format!("SELECT {} FROM documents WHERE id = ?", DOCUMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    async fn get_document_by_file_name(&self, file_name: &str) -> Result<Option<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE file_name = ? ORDER BY uploaded_at DESC LIMIT 1",
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents ORDER BY uploaded_at DESC, rowid DESC",
            DOCUMENT_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn list_chunks(&self) -> Result<Vec<DocumentChunk>> {
        let sql = format!("SELECT {} FROM chunks ORDER BY seq ASC", CHUNK_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<DocumentChunk>> {
        let sql = format!(
            "SELECT {} FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC",
            CHUNK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
        let blob = chunk.embedding.as_deref().map(vec_to_blob);
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, text, hash, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(blob)
        .bind(chunk.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_index_status(
        &self,
        document_id: &str,
        indexed: bool,
        indexed_at: Option<i64>,
        chunk_count: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET indexed = ?, indexed_at = ?, chunk_count = ? WHERE id = ?",
        )
        .bind(indexed)
        .bind(indexed_at)
        .bind(chunk_count)
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("document not found: {}", document_id);
        }
        Ok(())
    }

    async fn delete_chunks(&self, document_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM documents").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn stats(&self) -> Result<CorpusStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM documents) AS documents,
                (SELECT COUNT(*) FROM documents WHERE indexed = 1) AS indexed_documents,
                (SELECT COUNT(*) FROM chunks) AS chunks,
                (SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL) AS embedded_chunks
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(CorpusStats {
            documents: row.get("documents"),
            indexed_documents: row.get("indexed_documents"),
            chunks: row.get("chunks"),
            embedded_chunks: row.get("embedded_chunks"),
        })
    }
}
