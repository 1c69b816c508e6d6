//! # docrank core
//!
//! Shared, I/O-free logic for docrank: data models, fixed-window chunking,
//! the TF-IDF vectorizer, cosine ranking, threshold filtering, heuristic
//! reranking, the store abstraction, and the indexing/query orchestrators
//! that tie them together.
//!
//! This crate contains no tokio, sqlx, or filesystem dependencies. Storage
//! is reached only through the [`store::DocumentStore`] trait, and progress
//! only through [`index::IndexProgressReporter`].
//!
//! ## Pipeline
//!
//! ```text
//!  index:  Document ─▶ chunk ─▶ fit(corpus ∪ new) ─▶ transform ─▶ persist
//!  query:  all chunks ─▶ fit ─▶ transform(query, chunks) ─▶ rank ─▶ top-K
//!                                   (then optionally: filter ─▶ rerank)
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod rerank;
pub mod search;
pub mod store;
pub mod vectorizer;
