//! Per-engine telemetry handle: structured logging plus best-effort
//! persistence to the external record sink.
//!
//! Persistence failures are caught here, logged, and swallowed — they never
//! reach an engine's control flow.

use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::{json, Value};
use shared_logging::{JsonLogger, LogLevel, LogRecord};

use crate::RecordSink;

/// Builder for [`EngineTelemetry`].
pub struct EngineTelemetryBuilder {
    engine: String,
    log_path: Option<PathBuf>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl EngineTelemetryBuilder {
    /// Creates a builder for the named engine.
    #[must_use]
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            log_path: None,
            sink: None,
        }
    }

    /// Sets the JSON log file path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the external record sink.
    #[must_use]
    pub fn record_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<EngineTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::new(path)?),
            None => None,
        };
        Ok(EngineTelemetry {
            inner: Arc::new(TelemetryInner {
                engine: self.engine,
                logger,
                sink: self.sink,
            }),
        })
    }
}

struct TelemetryInner {
    engine: String,
    logger: Option<JsonLogger>,
    sink: Option<Arc<dyn RecordSink>>,
}

/// Cheaply cloneable telemetry handle carried by an engine.
#[derive(Clone)]
pub struct EngineTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for EngineTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineTelemetry")
            .field("engine", &self.inner.engine)
            .field("has_logger", &self.inner.logger.is_some())
            .field("has_sink", &self.inner.sink.is_some())
            .finish()
    }
}

impl EngineTelemetry {
    /// Returns a builder for the named engine.
    #[must_use]
    pub fn builder(engine: impl Into<String>) -> EngineTelemetryBuilder {
        EngineTelemetryBuilder::new(engine)
    }

    /// Engine name this handle belongs to.
    #[must_use]
    pub fn engine(&self) -> &str {
        &self.inner.engine
    }

    /// Writes a structured log line. Best effort: failures are reported via
    /// `tracing` and otherwise ignored.
    pub fn log(&self, level: LogLevel, message: &str, fields: Value) {
        if let Some(logger) = &self.inner.logger {
            let record =
                LogRecord::new(&self.inner.engine, level, message).with_fields(fields);
            if let Err(err) = logger.append(&record) {
                tracing::warn!(engine = %self.inner.engine, %err, "log append failed");
            }
        }
    }

    /// Appends a record to the external sink. Best effort: a failed insert is
    /// logged and swallowed — in-memory state stays authoritative.
    pub async fn persist(&self, table: &str, record: Value) {
        let Some(sink) = &self.inner.sink else {
            return;
        };
        if let Err(err) = sink.insert(table, record).await {
            self.log(
                LogLevel::Warn,
                "sink.insert_failed",
                json!({ "table": table, "error": err.to_string() }),
            );
            tracing::warn!(engine = %self.inner.engine, table, %err, "sink insert failed");
        }
    }

    /// Returns the recent log tail, oldest first (empty without a logger).
    #[must_use]
    pub fn recent_logs(&self) -> Vec<LogRecord> {
        self.inner
            .logger
            .as_ref()
            .map(JsonLogger::recent)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FailingRecordSink, MemoryRecordSink};
    use tempfile::tempdir;

    #[tokio::test]
    async fn persists_records_through_sink() {
        let sink = Arc::new(MemoryRecordSink::new());
        let telemetry = EngineTelemetry::builder("evolution")
            .record_sink(sink.clone())
            .build()
            .unwrap();
        telemetry
            .persist("ai_versions", json!({ "version": "2.0.0" }))
            .await;
        assert_eq!(sink.table_len("ai_versions"), 1);
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed_and_logged() {
        let dir = tempdir().unwrap();
        let telemetry = EngineTelemetry::builder("reconfiguration")
            .log_path(dir.path().join("reconfiguration.log"))
            .record_sink(Arc::new(FailingRecordSink))
            .build()
            .unwrap();
        // Must not panic or propagate.
        telemetry
            .persist("ai_reconfig_actions", json!({ "status": "applied" }))
            .await;
        let tail = telemetry.recent_logs();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].message, "sink.insert_failed");
        assert_eq!(tail[0].level, LogLevel::Warn);
    }
}
