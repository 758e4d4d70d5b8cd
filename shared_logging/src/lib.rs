#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON logging shared by every autonomic engine.
//!
//! Engines log best-effort: a logger is always optional and a failed write
//! never alters control flow. The logger keeps a bounded in-memory tail so
//! operators can inspect recent activity without re-reading the log file.

use std::{
    collections::VecDeque,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operational events.
    Info,
    /// Degraded but recoverable situations.
    Warn,
    /// Failures requiring attention.
    Error,
}

/// One structured log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in UTC.
    pub timestamp: DateTime<Utc>,
    /// Engine emitting the record (e.g. `coordination`).
    pub engine: String,
    /// Severity.
    pub level: LogLevel,
    /// Event name or human-readable message.
    pub message: String,
    /// Structured payload.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(engine: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            engine: engine.into(),
            level,
            message: message.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Attaches a structured payload, replacing any existing fields.
    #[must_use]
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        if let Some(map) = fields.as_object() {
            self.fields = map.clone();
        }
        self
    }
}

/// Default number of records retained in the in-memory tail.
pub const DEFAULT_TAIL_CAPACITY: usize = 256;

struct LoggerInner {
    file: File,
    tail: VecDeque<LogRecord>,
}

impl std::fmt::Debug for LoggerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerInner")
            .field("tail", &self.tail.len())
            .finish()
    }
}

/// Append-only JSON-lines logger with a bounded in-memory tail.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    tail_capacity: usize,
    inner: Mutex<LoggerInner>,
}

impl JsonLogger {
    /// Creates or opens a logger at the given path, creating parent
    /// directories as needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_tail_capacity(path, DEFAULT_TAIL_CAPACITY)
    }

    /// Creates a logger retaining at most `capacity` records in memory.
    pub fn with_tail_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            tail_capacity: capacity.max(1),
            inner: Mutex::new(LoggerInner {
                file,
                tail: VecDeque::with_capacity(capacity.max(1)),
            }),
        })
    }

    /// Appends one record as a JSON line and retains it in the tail.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        serde_json::to_writer(&mut inner.file, record)?;
        inner.file.write_all(b"\n")?;
        inner.file.flush()?;
        if inner.tail.len() == self.tail_capacity {
            inner.tail.pop_front();
        }
        inner.tail.push_back(record.clone());
        Ok(())
    }

    /// Returns the retained tail, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<LogRecord> {
        self.inner.lock().tail.iter().cloned().collect()
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn appends_json_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("engine.log")).unwrap();
        logger
            .append(
                &LogRecord::new("coordination", LogLevel::Info, "cycle.start")
                    .with_fields(json!({ "goals": 2 })),
            )
            .unwrap();
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"cycle.start\""));
        assert!(content.contains("\"goals\":2"));
    }

    #[test]
    fn tail_is_bounded() {
        let dir = tempdir().unwrap();
        let logger =
            JsonLogger::with_tail_capacity(dir.path().join("engine.log"), 3).unwrap();
        for idx in 0..10 {
            logger
                .append(&LogRecord::new("test", LogLevel::Debug, format!("event-{idx}")))
                .unwrap();
        }
        let tail = logger.recent();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].message, "event-7");
        assert_eq!(tail[2].message, "event-9");
    }
}
