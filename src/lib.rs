//! # docrank
//!
//! A local-first personal knowledge base for grounding AI answers.
//!
//! docrank stores uploaded text documents, splits them into overlapping
//! fixed-size chunks, and answers free-text queries with the most relevant
//! chunks ranked by TF-IDF cosine similarity, optionally filtered by a
//! similarity threshold and reranked with document-diversity, chunk-length,
//! and position heuristics. The result can be rendered as a grounded prompt
//! for an upstream language-model caller.
//!
//! The ranking engine itself lives in [`docrank_core`]; this crate adds the
//! SQLite store, configuration, progress reporting, directory ingestion, and
//! the `docrank` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌──────────┐
//! │ add/ingest │──▶│ index: chunk +   │──▶│  SQLite   │
//! │  (files)   │   │ fit + embed      │   │ docs+chunks│
//! └────────────┘   └──────────────────┘   └────┬─────┘
//!                                              │
//!                     ┌────────────────────────┤
//!                     ▼                        ▼
//!              ┌─────────────┐         ┌──────────────┐
//!              │ search/docs │         │   context    │
//!              │ (ranked)    │         │ (prompt)     │
//!              └─────────────┘         └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docrank init                          # create database
//! docrank add notes.md --index          # add and index a file
//! docrank ingest ./docs                 # add and index a directory
//! docrank search "deployment" --rerank
//! docrank context "How do I deploy?"    # print a grounded prompt
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite `DocumentStore` |
//! | [`service`] | `KnowledgeBase` facade, async indexing handles |
//! | [`progress`] | Indexing and ingest progress reporters |
//! | [`ingest`] | Directory ingestion |
//! | [`context`] | Grounded context and prompt rendering |
//! | [`documents`] | `add`, `index`, `list`, `delete` commands |
//! | [`search`] | `search`, `context`, `docs` commands |
//! | [`get`] | Document retrieval by ID |
//! | [`stats`] | Corpus statistics |

pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod service;
pub mod sqlite_store;
pub mod stats;
