//! Lifecycle events for parse calls.
//!
//! The orchestrator reports to an injected [`EventSink`]. Sinks are
//! fire-and-forget: whatever they return is logged and dropped.
//!
//! `emit` runs synchronously on the parsing thread, so a sink must not
//! block. Hand events to a channel when delivery can be slow.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{CasError, Result};
use crate::models::format::FormatType;
use crate::models::statement::Summary;

/// One lifecycle event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseEvent {
    pub ts: DateTime<Utc>,
    /// `started`, `detected`, `succeeded` or `failed`.
    pub name: &'static str,
    pub tracking_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ParseEvent {
    fn new(name: &'static str, tracking_id: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            ts: Utc::now(),
            name,
            tracking_id: tracking_id.to_string(),
            fields,
        }
    }

    #[must_use]
    pub fn started(tracking_id: &str, document_bytes: usize) -> Self {
        Self::new("started", tracking_id, json!({ "documentBytes": document_bytes }))
    }

    #[must_use]
    pub fn detected(tracking_id: &str, format: FormatType) -> Self {
        Self::new("detected", tracking_id, json!({ "casType": format }))
    }

    #[must_use]
    pub fn succeeded(tracking_id: &str, format: FormatType, summary: &Summary) -> Self {
        Self::new(
            "succeeded",
            tracking_id,
            json!({
                "casType": format,
                "holdingsCount": summary.holdings_count,
                "fundsCount": summary.funds_count,
                "totalValue": summary.total_value,
            }),
        )
    }

    #[must_use]
    pub fn failed(tracking_id: &str, format: FormatType, error: &CasError) -> Self {
        Self::new(
            "failed",
            tracking_id,
            json!({
                "casType": format,
                "kind": error.kind(),
                "message": error.to_string(),
            }),
        )
    }

    /// True for `succeeded` and `failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.name, "succeeded" | "failed")
    }
}

/// Receiver of parse lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ParseEvent) -> Result<()>;
}

/// Forwards events to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ParseEvent) -> Result<()> {
        let fields = serde_json::to_string(&event.fields)?;
        tracing::info!(
            target: "cas_parser::events",
            event = event.name,
            tracking_id = %event.tracking_id,
            %fields,
            "parse event"
        );
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &ParseEvent) -> Result<()> {
        Ok(())
    }
}

/// Appends events to a JSONL file, one object per line.
///
/// The file is opened once; each event is a single append.
pub struct JsonlSink {
    // Serializes appends from concurrent parses.
    file: Mutex<File>,
}

impl JsonlSink {
    /// Open (or create) the log file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for JsonlSink {
    fn emit(&self, event: &ParseEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| CasError::Config("event log lock poisoned".into()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
