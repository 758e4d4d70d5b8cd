#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Append-only record sink shared by the autonomic engines.
//!
//! The sink is the one external collaborator of the core: a per-table
//! `insert` with no read path. Engines treat every insert as best effort;
//! the in-memory state of each engine remains the source of truth.

/// Telemetry handles combining a logger with a record sink.
pub mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

pub use telemetry::{EngineTelemetry, EngineTelemetryBuilder};

/// Errors surfaced by sink implementations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backing store rejected the write.
    #[error("sink write failed for table {table}: {reason}")]
    WriteFailed {
        /// Target table.
        table: String,
        /// Backend-specific reason.
        reason: String,
    },
}

/// Append-only record store, one logical table per name.
///
/// Implementations must accept any JSON value and never expose a read-back
/// path to the engines.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Appends a record to the named table.
    async fn insert(&self, table: &str, record: serde_json::Value) -> Result<()>;
}

/// In-memory sink retaining records per table (tests, demos, dashboards).
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordSink {
    tables: Arc<Mutex<IndexMap<String, Vec<serde_json::Value>>>>,
}

impl MemoryRecordSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the named table's records, oldest first.
    #[must_use]
    pub fn snapshot(&self, table: &str) -> Vec<serde_json::Value> {
        self.tables
            .lock()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of records in the named table.
    #[must_use]
    pub fn table_len(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, Vec::len)
    }

    /// Returns (table, count) pairs in insertion order.
    #[must_use]
    pub fn table_counts(&self) -> Vec<(String, usize)> {
        self.tables
            .lock()
            .iter()
            .map(|(name, rows)| (name.clone(), rows.len()))
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    async fn insert(&self, table: &str, record: serde_json::Value) -> Result<()> {
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}

/// File-backed sink writing one JSON-lines file per table.
#[derive(Debug, Clone)]
pub struct FileRecordSink {
    root: PathBuf,
}

impl FileRecordSink {
    /// Creates a sink rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the file path backing the named table.
    #[must_use]
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.jsonl"))
    }
}

#[async_trait]
impl RecordSink for FileRecordSink {
    async fn insert(&self, table: &str, record: serde_json::Value) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table))
            .await?;
        let data = serde_json::to_vec(&record)?;
        file.write_all(&data).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// Sink that rejects every insert. Used to exercise best-effort semantics.
#[derive(Debug, Default, Clone)]
pub struct FailingRecordSink;

#[async_trait]
impl RecordSink for FailingRecordSink {
    async fn insert(&self, table: &str, _record: serde_json::Value) -> Result<()> {
        Err(SinkError::WriteFailed {
            table: table.to_string(),
            reason: "sink unavailable".to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn memory_sink_keeps_tables_ordered() {
        let sink = MemoryRecordSink::new();
        sink.insert("ai_versions", json!({ "version": "1.0.0" }))
            .await
            .unwrap();
        sink.insert("ai_versions", json!({ "version": "1.1.0" }))
            .await
            .unwrap();
        sink.insert("coordination_log", json!({ "event": "cycle" }))
            .await
            .unwrap();
        assert_eq!(sink.table_len("ai_versions"), 2);
        assert_eq!(sink.snapshot("ai_versions")[1]["version"], "1.1.0");
        assert_eq!(
            sink.table_counts(),
            vec![("ai_versions".to_string(), 2), ("coordination_log".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let sink = FileRecordSink::new(dir.path()).unwrap();
        sink.insert("ai_recovery_plans", json!({ "actions": 3 }))
            .await
            .unwrap();
        sink.insert("ai_recovery_plans", json!({ "actions": 1 }))
            .await
            .unwrap();
        let content = std::fs::read_to_string(sink.table_path("ai_recovery_plans")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn failing_sink_reports_table() {
        let sink = FailingRecordSink;
        let err = sink
            .insert("ai_configurations", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ai_configurations"));
    }
}
