//! Indexing and ingest progress reporting.
//!
//! Reports observable progress during `docrank index`, `docrank add --index`
//! and `docrank ingest` so users see which chunk is being embedded and how
//! many files are left. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts.
//!
//! Indexing events come from the core orchestrator as
//! [`IndexingProgress`]; ingest events are [`IngestEvent`]s. Every reporter
//! here handles both.

use std::io::Write;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use docrank_core::index::{IndexProgressReporter, IndexStage, IndexingProgress};

/// A single directory-ingest event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum IngestEvent {
    /// Walking the directory. Total unknown.
    Scanning { root: String },
    /// Matching files found.
    Found { total: usize },
    /// Working on file `n` of `total`.
    Indexing {
        n: usize,
        total: usize,
        file_name: String,
    },
    Completed {
        indexed: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Receives ingest events. Implementations write to stderr (human or JSON).
pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr: `index notes.md  embedding  3 / 12 chunks`.
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexingProgress) {
        let line = match event.stage {
            IndexStage::Embedding => format!(
                "index {}  embedding  {} / {} chunks\n",
                event.file_name,
                format_number(event.processed_chunks as u64),
                format_number(event.total_chunks as u64)
            ),
            IndexStage::Persisted => format!(
                "index {}  done  {} chunks\n",
                event.file_name,
                format_number(event.total_chunks as u64)
            ),
            _ => format!("index {}  {}\n", event.file_name, event.status),
        };
        write_stderr(&line);
    }
}

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Scanning { root } => format!("ingest {}  scanning...\n", root),
            IngestEvent::Found { total } => {
                format!("ingest  found {} files\n", format_number(*total as u64))
            }
            IngestEvent::Indexing {
                n,
                total,
                file_name,
            } => format!(
                "ingest  {} / {}  {}\n",
                format_number(*n as u64),
                format_number(*total as u64),
                file_name
            ),
            IngestEvent::Completed {
                indexed,
                skipped,
                failed,
            } => format!(
                "ingest  done  {} indexed, {} skipped, {} failed\n",
                indexed, skipped, failed
            ),
        };
        write_stderr(&line);
    }
}

fn write_stderr(line: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = stderr.write_all(line.as_bytes());
    let _ = stderr.flush();
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexingProgress) {
        let obj = serde_json::json!({
            "event": "index",
            "document_id": event.document_id,
            "file_name": event.file_name,
            "stage": event.stage,
            "processed": event.processed_chunks,
            "total": event.total_chunks,
            "status": event.status,
        });
        write_json_line(&obj);
    }
}

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestEvent) {
        if let Ok(mut obj) = serde_json::to_value(&event) {
            if let Some(map) = obj.as_object_mut() {
                map.insert("event".to_string(), serde_json::json!("ingest"));
            }
            write_json_line(&obj);
        }
    }
}

fn write_json_line(obj: &serde_json::Value) {
    if let Ok(line) = serde_json::to_string(obj) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", line);
        let _ = stderr.flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexingProgress) {}
}

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// Forwards indexing events into an unbounded channel.
///
/// Never blocks the sender. Events sent after the receiver is dropped are
/// discarded.
pub struct ChannelProgress {
    tx: UnboundedSender<IndexingProgress>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<IndexingProgress>) -> Self {
        Self { tx }
    }
}

impl IndexProgressReporter for ChannelProgress {
    fn report(&self, event: IndexingProgress) {
        let _ = self.tx.send(event);
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn index_reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }

    pub fn ingest_reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
