//! SQLite replay target: one database file per name under a data directory.
//!
//! "Dropping a database" removes its file and journal siblings; "creating and
//! selecting" it opens a fresh file and starts the single replay transaction,
//! so nothing is durable until `commit`.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::ffi::ErrorCode;
use rusqlite::{Batch, Connection, OpenFlags};

use crate::core::config::TargetConfig;
use crate::core::errors::{Result, SrhError};
use crate::replay::target::{ExecError, TargetConnection, validate_database_name};

const DB_EXTENSION: &str = "sqlite3";
const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Exclusive session against a SQLite data directory.
///
/// The session is open from `connect` until `close`; a database file is only
/// opened once one is selected by `reset_database`.
pub struct SqliteTarget {
    data_dir: PathBuf,
    busy_timeout: Duration,
    open: bool,
    conn: Option<Connection>,
    database: Option<String>,
}

impl SqliteTarget {
    /// Start a session rooted at `config.data_dir`, creating the directory.
    ///
    /// No database is selected until [`TargetConnection::reset_database`].
    pub fn connect(config: &TargetConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|e| {
            SrhError::connection(
                "connect",
                format!("cannot create data dir {}: {e}", config.data_dir.display()),
            )
        })?;
        Ok(Self {
            data_dir: config.data_dir.clone(),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            open: true,
            conn: None,
            database: None,
        })
    }

    /// File backing the database `name`.
    pub fn database_path(&self, name: &str) -> PathBuf {
        database_file(&self.data_dir, name)
    }

    /// Currently selected database, if any.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn open_database(&self, path: &Path) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SrhError::connection("reset_database", e.to_string()))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| SrhError::connection("reset_database", e.to_string()))?;
        conn.execute_batch("BEGIN")
            .map_err(|e| SrhError::connection("reset_database", e.to_string()))?;
        Ok(conn)
    }

    /// Release the selected database file, rolling back uncommitted work.
    fn release_database(&mut self) -> Result<()> {
        self.database = None;
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| SrhError::connection("close", e.to_string()))?;
        }
        Ok(())
    }
}

impl TargetConnection for SqliteTarget {
    /// Run one log line. A line holding more than one statement is rejected
    /// as a whole; none of it runs.
    fn execute(&mut self, sql: &str) -> std::result::Result<(), ExecError> {
        if !self.open {
            return Err(ExecError::Fatal("connection is closed".to_string()));
        }
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| ExecError::Statement("no database selected".to_string()))?;

        let mut batch = Batch::new(conn, sql);
        let Some(mut stmt) = batch.next().map_err(|e| classify(&e))? else {
            return Ok(());
        };
        if !matches!(batch.next(), Ok(None)) {
            return Err(ExecError::Statement(
                "multiple statements on one line".to_string(),
            ));
        }

        let mut rows = stmt.raw_query();
        while rows.next().map_err(|e| classify(&e))?.is_some() {}
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.open {
            return Err(SrhError::connection("commit", "connection is closed"));
        }
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };
        // The replayed log may already have committed on its own.
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")
                .map_err(|e| SrhError::connection("commit", e.to_string()))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        self.release_database()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn reset_database(&mut self, name: &str) -> Result<()> {
        validate_database_name(name)?;
        if !self.open {
            return Err(SrhError::connection("reset_database", "connection is closed"));
        }

        // Release any handle on the previous file before unlinking it.
        self.release_database()?;

        let path = self.database_path(name);
        remove_if_exists(&path)?;
        for suffix in SIDECAR_SUFFIXES {
            remove_if_exists(&sidecar(&path, suffix))?;
        }

        self.conn = Some(self.open_database(&path)?);
        self.database = Some(name.to_string());
        Ok(())
    }
}

impl Drop for SqliteTarget {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Path of the SQLite file for database `name` under `data_dir`.
pub fn database_file(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.{DB_EXTENSION}"))
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SrhError::connection(
            "reset_database",
            format!("cannot drop {}: {e}", path.display()),
        )),
    }
}

/// Split SQLite failures into session-ending and statement-only.
fn classify(err: &rusqlite::Error) -> ExecError {
    let fatal = match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::DiskFull
                | ErrorCode::OutOfMemory
                | ErrorCode::InternalMalfunction
        ),
        _ => false,
    };
    if fatal {
        ExecError::Fatal(err.to_string())
    } else {
        ExecError::Statement(err.to_string())
    }
}
