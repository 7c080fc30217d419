//! Extracts the replayable SQL block from a captured execution log.
//!
//! Fuzzer logs carry a preamble (connection chatter, option dumps, oracle
//! notes) before the first table definition. Everything from that first
//! `CREATE TABLE` line to end-of-file is the block, one statement per line.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{Result, SrhError};

/// Default keyword sequence that opens the replay block.
pub const DEFAULT_BLOCK_START: &str = "CREATE TABLE";
/// Default line-comment marker.
pub const DEFAULT_COMMENT_MARKER: &str = "--";

/// One executable line from the replay block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// 1-based position within the block.
    pub position: usize,
    /// 1-based line number in the source log.
    pub line: usize,
    /// Trimmed statement text, never empty.
    pub sql: String,
}

/// Ordered statements extracted from one log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayLog {
    pub source: Option<PathBuf>,
    /// Line where the block opened, if it opened at all.
    pub block_start_line: Option<usize>,
    pub statements: Vec<Statement>,
}

impl ReplayLog {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }
}

impl<'a> IntoIterator for &'a ReplayLog {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

/// Scanner position relative to the replay block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Preamble,
    InBlock,
}

/// Line filter rules for the block scanner.
#[derive(Debug, Clone)]
pub struct LogFormat {
    block_start: String,
    comment_marker: String,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_START, DEFAULT_COMMENT_MARKER)
    }
}

impl LogFormat {
    /// Marker matching is case-insensitive; the stored form is upper-cased.
    pub fn new(block_start: &str, comment_marker: &str) -> Self {
        Self {
            block_start: block_start.trim().to_uppercase(),
            comment_marker: comment_marker.trim().to_string(),
        }
    }

    fn opens_block(&self, trimmed: &str) -> bool {
        trimmed.to_uppercase().starts_with(&self.block_start)
    }

    fn is_comment(&self, trimmed: &str) -> bool {
        trimmed.starts_with(&self.comment_marker)
    }

    /// Parse log text already in memory.
    pub fn parse_str(&self, text: &str) -> ReplayLog {
        let mut state = ScanState::Preamble;
        let mut log = ReplayLog::default();

        for (idx, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if state == ScanState::Preamble && self.opens_block(trimmed) {
                state = ScanState::InBlock;
                log.block_start_line = Some(idx + 1);
            }
            if state == ScanState::InBlock && !trimmed.is_empty() && !self.is_comment(trimmed) {
                log.statements.push(Statement {
                    position: log.statements.len() + 1,
                    line: idx + 1,
                    sql: trimmed.to_string(),
                });
            }
        }

        log
    }

    /// Read and parse a log file.
    pub fn parse_file(&self, path: &Path) -> Result<ReplayLog> {
        let bytes = fs::read(path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                SrhError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                SrhError::io(path, source)
            }
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            SrhError::io(path, std::io::Error::new(ErrorKind::InvalidData, e))
        })?;

        let mut log = self.parse_str(&text);
        log.source = Some(path.to_path_buf());
        Ok(log)
    }
}

/// Parse `path` with the default `CREATE TABLE` / `--` rules.
pub fn parse_log(path: &Path) -> Result<ReplayLog> {
    LogFormat::default().parse_file(path)
}

/// Parse in-memory text with the default rules.
pub fn parse_log_str(text: &str) -> ReplayLog {
    LogFormat::default().parse_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqls(log: &ReplayLog) -> Vec<&str> {
        log.iter().map(|s| s.sql.as_str()).collect()
    }

    #[test]
    fn preamble_is_discarded() {
        let text = "\
-- Time: 2024/05/01
SET GLOBAL sql_log_off = ON;
INSERT INTO t VALUES (0);
CREATE TABLE t0 (c0 INT);
INSERT INTO t0 VALUES (1);
";
        let log = parse_log_str(text);
        assert_eq!(
            sqls(&log),
            vec!["CREATE TABLE t0 (c0 INT);", "INSERT INTO t0 VALUES (1);"]
        );
        assert_eq!(log.block_start_line, Some(4));
    }

    #[test]
    fn block_start_is_case_insensitive_and_trimmed() {
        let log = parse_log_str("noise\n   create   table ignored\n  Create Table t (x INT);\n");
        assert_eq!(log.block_start_line, Some(3));
        assert_eq!(sqls(&log), vec!["Create Table t (x INT);"]);
    }

    #[test]
    fn comments_and_blanks_inside_block_are_skipped() {
        let text = "CREATE TABLE t (x INT);\n\n   \n-- comment\n  -- indented comment\nINSERT INTO t VALUES (1);\n";
        let log = parse_log_str(text);
        assert_eq!(log.len(), 2);
        assert_eq!(log.statements[1].position, 2);
        assert_eq!(log.statements[1].line, 6);
    }

    #[test]
    fn block_never_closes() {
        let text = "CREATE TABLE a (x INT);\nSELECT 1;\nCREATE TABLE b (y INT);\nrandom trailing text\n";
        let log = parse_log_str(text);
        assert_eq!(log.len(), 4);
        assert_eq!(log.statements[3].sql, "random trailing text");
    }

    #[test]
    fn no_marker_yields_empty_log() {
        let log = parse_log_str("SELECT 1;\nINSERT INTO t VALUES (1);\n");
        assert!(log.is_empty());
        assert_eq!(log.block_start_line, None);
    }

    #[test]
    fn positions_are_dense_and_one_based() {
        let log = parse_log_str("CREATE TABLE t (x INT);\n-- c\nA;\n\nB;\n");
        let positions: Vec<usize> = log.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn custom_format_markers() {
        let format = LogFormat::new("create view", "#");
        let log = format.parse_str("CREATE TABLE t (x);\nCREATE VIEW v AS SELECT 1;\n# note\nSELECT * FROM v;\n");
        assert_eq!(sqls(&log), vec!["CREATE VIEW v AS SELECT 1;", "SELECT * FROM v;"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = parse_log(Path::new("/nonexistent/srh/database0.log")).unwrap_err();
        assert!(matches!(err, SrhError::NotFound { .. }), "{err}");
    }

    #[test]
    fn non_utf8_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.log");
        fs::write(&path, [0x43, 0x52, 0xff, 0xfe, 0x0a]).unwrap();
        let err = parse_log(&path).unwrap_err();
        assert!(matches!(err, SrhError::Io { .. }), "{err}");
    }

    #[test]
    fn file_parse_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database0.log");
        fs::write(&path, "CREATE TABLE t (x INT);\r\nINSERT INTO t VALUES (1);\r\n").unwrap();
        let log = parse_log(&path).unwrap();
        assert_eq!(log.source.as_deref(), Some(path.as_path()));
        assert_eq!(sqls(&log), vec!["CREATE TABLE t (x INT);", "INSERT INTO t VALUES (1);"]);
    }
}
