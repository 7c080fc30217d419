//! JSONL event log: append-only line-delimited JSON describing replay and
//! weight-generation runs.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so a tailing reader never sees half a record.
//! When the log file cannot be written the writer degrades to stderr (prefixed
//! with `[SRH-JSONL]`) and finally discards; logging never fails a run.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SrhError};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Event types emitted by the harness and the weight generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ConfigLoaded,
    ReplayStart,
    DatabaseReset,
    StatementFailed,
    ReplayComplete,
    ReplayAborted,
    WeightsGenerated,
}

/// A single JSONL record. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Target database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// 1-based statement position within the replay block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// 1-based line in the source log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Statements attempted, or pairs generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            database: None,
            position: None,
            line: None,
            sql: None,
            error_code: None,
            error_message: None,
            count: None,
            failed: None,
            path: None,
            duration_ms: None,
            details: None,
        }
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach an error's stable code and display text.
    pub fn with_error(mut self, err: &SrhError) -> Self {
        self.error_code = Some(err.code().to_string());
        self.error_message = Some(err.to_string());
        self
    }
}

/// Anything that accepts log entries.
pub trait EventSink {
    fn record(&mut self, entry: &LogEntry);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&mut self, _entry: &LogEntry) {}
}

/// Sink that keeps entries in memory, mostly for tests and `--json` summaries.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub entries: Vec<LogEntry>,
}

impl MemorySink {
    pub fn events(&self) -> impl Iterator<Item = &EventType> {
        self.entries.iter().map(|e| &e.event)
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, entry: &LogEntry) {
        self.entries.push(entry.clone());
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL writer with stderr fallback.
pub struct JsonlWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    lines_written: u64,
}

impl JsonlWriter {
    /// Open the log file for appending. Falls back to stderr on failure.
    pub fn open(path: &Path) -> Self {
        let (writer, state) = match open_append(path) {
            Ok(file) => (Some(BufWriter::new(file)), WriterState::Normal),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SRH-JSONL] {e}; logging to stderr");
                (None, WriterState::Stderr)
            }
        };
        Self {
            path: path.to_path_buf(),
            writer,
            state,
            lines_written: 0,
        }
    }

    /// Write a single entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[SRH-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn write_line(&mut self, line: &str) {
        match self.state {
            WriterState::Normal => {
                let ok = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).is_ok());
                if ok {
                    self.lines_written += 1;
                } else {
                    self.writer = None;
                    self.state = WriterState::Stderr;
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[SRH-JSONL] {line}").is_err() {
                    self.state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }
}

impl EventSink for JsonlWriter {
    fn record(&mut self, entry: &LogEntry) {
        self.write_entry(entry);
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SrhError::io(parent, source))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SrhError::io(path, source))
}

/// Format current UTC time as RFC 3339 with millisecond precision.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
