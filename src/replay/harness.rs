//! Replay driver: reset the target, run every statement in log order with
//! per-statement fault isolation, commit once at the end.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::errors::{Result, SrhError};
use crate::logger::jsonl::{EventSink, EventType, LogEntry, Severity};
use crate::replay::log_parser::{ReplayLog, Statement};
use crate::replay::target::TargetConnection;

/// One statement that the target rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementFailure {
    /// 1-based position within the replay block.
    pub position: usize,
    /// 1-based line in the source log.
    pub line: usize,
    pub sql: String,
    pub message: String,
}

impl StatementFailure {
    fn new(statement: &Statement, message: &str) -> Self {
        Self {
            position: statement.position,
            line: statement.line,
            sql: statement.sql.clone(),
            message: message.to_string(),
        }
    }

    /// The failure as a crate error, for logging with a stable code.
    pub fn to_error(&self) -> SrhError {
        SrhError::Statement {
            position: self.position,
            details: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStatus {
    /// Every statement was attempted and the transaction committed.
    Completed,
    /// The log had no replayable block; the target was not touched.
    NothingToRun,
}

/// Outcome of a replay that did not hit a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub status: ReplayStatus,
    pub database: Option<String>,
    pub total: usize,
    pub attempted: usize,
    pub failures: Vec<StatementFailure>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ReplayReport {
    fn nothing_to_run() -> Self {
        Self {
            status: ReplayStatus::NothingToRun,
            database: None,
            total: 0,
            attempted: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// True when no statement failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Reset `database` on `conn` so the replay starts from nothing.
pub fn reset_database<C: TargetConnection + ?Sized>(
    conn: &mut C,
    database: &str,
    sink: &mut dyn EventSink,
) -> Result<()> {
    match conn.reset_database(database) {
        Ok(()) => {
            sink.record(
                &LogEntry::new(EventType::DatabaseReset, Severity::Info).with_database(database),
            );
            Ok(())
        }
        Err(err) => {
            sink.record(
                &LogEntry::new(EventType::ReplayAborted, Severity::Critical)
                    .with_database(database)
                    .with_error(&err),
            );
            Err(err)
        }
    }
}

/// Execute every statement of `log` in order, then commit once.
///
/// Statement-level failures are recorded and skipped over. A fatal failure
/// stops the run before the commit and is returned as `Connection`.
pub fn replay<C: TargetConnection + ?Sized>(
    conn: &mut C,
    log: &ReplayLog,
    sink: &mut dyn EventSink,
) -> Result<ReplayReport> {
    let started = Instant::now();
    let mut failures = Vec::new();
    let mut attempted = 0usize;

    for statement in log {
        attempted += 1;
        if let Err(err) = conn.execute(&statement.sql) {
            if err.is_fatal() {
                let fatal = SrhError::connection(
                    "replay",
                    format!("statement {}: {}", statement.position, err.message()),
                );
                sink.record(&aborted_entry(statement, &fatal));
                return Err(fatal);
            }
            let failure = StatementFailure::new(statement, err.message());
            let mut entry = LogEntry::new(EventType::StatementFailed, Severity::Warning)
                .with_error(&failure.to_error());
            entry.position = Some(failure.position);
            entry.line = Some(failure.line);
            entry.sql = Some(failure.sql.clone());
            sink.record(&entry);
            failures.push(failure);
        }
    }

    if let Err(err) = conn.commit() {
        sink.record(
            &LogEntry::new(EventType::ReplayAborted, Severity::Critical).with_error(&err),
        );
        return Err(err);
    }

    let report = ReplayReport {
        status: ReplayStatus::Completed,
        database: None,
        total: log.len(),
        attempted,
        failures,
        elapsed: started.elapsed(),
    };

    let mut entry = LogEntry::new(EventType::ReplayComplete, Severity::Info);
    entry.count = Some(report.attempted);
    entry.failed = Some(report.failed());
    entry.duration_ms = u64::try_from(report.elapsed.as_millis()).ok();
    sink.record(&entry);

    Ok(report)
}

fn aborted_entry(statement: &Statement, err: &SrhError) -> LogEntry {
    let mut entry = LogEntry::new(EventType::ReplayAborted, Severity::Critical).with_error(err);
    entry.position = Some(statement.position);
    entry.line = Some(statement.line);
    entry.sql = Some(statement.sql.clone());
    entry
}

/// Reset then replay on an already connected target.
///
/// An empty log short-circuits to `NothingToRun` without resetting anything.
pub fn reset_and_replay<C: TargetConnection + ?Sized>(
    conn: &mut C,
    database: &str,
    log: &ReplayLog,
    sink: &mut dyn EventSink,
) -> Result<ReplayReport> {
    if log.is_empty() {
        return Ok(ReplayReport::nothing_to_run());
    }
    let mut entry = LogEntry::new(EventType::ReplayStart, Severity::Info).with_database(database);
    entry.count = Some(log.len());
    if let Some(src) = &log.source {
        entry = entry.with_path(src);
    }
    sink.record(&entry);

    reset_database(conn, database, sink)?;
    let mut report = replay(conn, log, sink)?;
    report.database = Some(database.to_string());
    Ok(report)
}

#[cfg(feature = "sqlite")]
pub use self::sqlite_run::run_replay;

#[cfg(feature = "sqlite")]
mod sqlite_run {
    use super::{ReplayReport, reset_and_replay};
    use crate::core::config::Config;
    use crate::core::errors::Result;
    use crate::logger::jsonl::EventSink;
    use crate::replay::log_parser::LogFormat;
    use crate::replay::sqlite_target::SqliteTarget;
    use crate::replay::target::ConnectionGuard;

    /// Full replay run: parse the configured log, connect, reset, replay, close.
    ///
    /// The target connection is released on every path, including fatal errors.
    pub fn run_replay(config: &Config, sink: &mut dyn EventSink) -> Result<ReplayReport> {
        let format = LogFormat::new(&config.replay.block_start, &config.replay.comment_marker);
        let log = format.parse_file(&config.replay.log_path)?;
        if log.is_empty() {
            return Ok(ReplayReport::nothing_to_run());
        }

        let mut guard = ConnectionGuard::new(SqliteTarget::connect(&config.target)?);
        let report = reset_and_replay(&mut *guard, &config.target.database, &log, sink)?;
        guard.close()?;
        Ok(report)
    }
}
