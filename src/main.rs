//! # docrank CLI
//!
//! The `docrank` binary manages a local knowledge base: add and index
//! documents, ingest documentation directories, and run ranked retrieval.
//!
//! ## Usage
//!
//! ```bash
//! docrank --config ./config/docrank.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docrank init` | Create the SQLite database and schema |
//! | `docrank add <file>` | Add a document (`--index` to index it right away) |
//! | `docrank index <id>` | Index a document (`--pending` for all unindexed) |
//! | `docrank ingest <dir>` | Add and index every new file under a directory |
//! | `docrank search "<query>"` | Ranked retrieval |
//! | `docrank context "<question>"` | Print a grounded prompt |
//! | `docrank docs "<query>"` | Search ingested project documentation |
//! | `docrank list` | List documents |
//! | `docrank get <id>` | Show a document and its chunks |
//! | `docrank delete <id>` | Delete a document (`--all` for everything) |
//! | `docrank stats` | Corpus statistics |
//! | `docrank completions <shell>` | Shell completion script |

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docrank::progress::ProgressMode;
use docrank::search::SearchOverrides;
use docrank::{config, documents, get, ingest, migrate, search, stats};

/// docrank — a local-first personal knowledge base with TF-IDF retrieval.
///
/// All commands except `completions` read a TOML configuration file given
/// by `--config`.
#[derive(Parser)]
#[command(
    name = "docrank",
    about = "docrank — a local-first personal knowledge base with TF-IDF retrieval and reranking",
    version,
    long_about = "docrank splits documents into overlapping chunks, ranks them against free-text \
    queries by TF-IDF cosine similarity, and optionally filters and reranks the results so a \
    language-model caller can ground its answers in your own material."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docrank.toml")]
    config: PathBuf,

    /// Progress on stderr: off, human, or json. Defaults to human on a TTY.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// More diagnostic logging on stderr (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and chunks
    /// tables. Running it multiple times is safe.
    Init,

    /// Add a text file as a document.
    Add {
        /// File to add. Its file name becomes the document name.
        file: PathBuf,

        /// Content type; guessed from the extension when omitted.
        #[arg(long)]
        content_type: Option<String>,

        /// Index the document immediately.
        #[arg(long)]
        index: bool,
    },

    /// Chunk, vectorize, and store a document's chunks.
    Index {
        /// Document id.
        #[arg(required_unless_present = "pending", conflicts_with = "pending")]
        id: Option<String>,

        /// Index every document that is not indexed yet.
        #[arg(long)]
        pending: bool,
    },

    /// Add and index every new matching file under a directory.
    ///
    /// Files are named `<prefix><relative path>` (prefix from
    /// `[ingest].file_name_prefix`); files already present are skipped.
    Ingest {
        /// Directory to walk.
        dir: PathBuf,
    },

    /// Ranked retrieval over the whole corpus.
    Search {
        /// The search query string.
        query: String,

        /// Number of results (default from `[retrieval].top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum similarity in [0, 1] (default from config).
        #[arg(long)]
        threshold: Option<f32>,

        /// Apply heuristic reranking.
        #[arg(long)]
        rerank: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a grounded prompt built from the best-matching chunks.
    Context {
        /// The user question.
        question: String,

        #[arg(long)]
        top_k: Option<usize>,

        #[arg(long)]
        threshold: Option<f32>,

        #[arg(long)]
        rerank: bool,
    },

    /// Search only ingested project documentation.
    Docs {
        query: String,

        /// Number of chunks searched before filtering to project docs.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// List documents, newest first.
    List {
        /// Only indexed documents.
        #[arg(long)]
        indexed: bool,
    },

    /// Show a document and its chunks.
    Get {
        /// Document id.
        id: String,
    },

    /// Delete a document and its chunks.
    Delete {
        /// Document id.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Delete every document.
        #[arg(long)]
        all: bool,
    },

    /// Show corpus statistics.
    Stats,

    /// Generate a shell completion script on stdout.
    Completions {
        shell: Shell,
    },
}

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("DOCRANK_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "docrank", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            file,
            content_type,
            index,
        } => {
            documents::run_add(&cfg, &file, content_type, index, progress).await?;
        }
        Commands::Index { id, pending } => {
            documents::run_index(&cfg, id, pending, progress).await?;
        }
        Commands::Ingest { dir } => {
            ingest::run_ingest(&cfg, &dir, progress).await?;
        }
        Commands::Search {
            query,
            top_k,
            threshold,
            rerank,
            json,
        } => {
            let overrides = SearchOverrides {
                top_k,
                threshold,
                rerank,
            };
            search::run_search(&cfg, &query, &overrides, json).await?;
        }
        Commands::Context {
            question,
            top_k,
            threshold,
            rerank,
        } => {
            let overrides = SearchOverrides {
                top_k,
                threshold,
                rerank,
            };
            search::run_context(&cfg, &question, &overrides).await?;
        }
        Commands::Docs { query, top_k } => {
            search::run_docs(&cfg, &query, top_k).await?;
        }
        Commands::List { indexed } => {
            documents::run_list(&cfg, indexed).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Delete { id, all } => {
            documents::run_delete(&cfg, id, all).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
