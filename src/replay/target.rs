//! Connection seam between the replay harness and the database under test.

#![allow(missing_docs)]

use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::core::errors::{Result, SrhError};

/// Failure from a single `execute` call, split by whether the session survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The session is unusable; the run must stop.
    #[error("fatal: {0}")]
    Fatal(String),
    /// The statement was rejected; the session is still good.
    #[error("{0}")]
    Statement(String),
}

impl ExecError {
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Fatal(msg) | Self::Statement(msg) => msg,
        }
    }
}

/// Minimal session interface the harness drives.
pub trait TargetConnection {
    /// Run one statement, discarding any rows it produces.
    fn execute(&mut self, sql: &str) -> std::result::Result<(), ExecError>;

    /// Make everything executed so far durable.
    fn commit(&mut self) -> Result<()>;

    /// Release the session. Calling it twice is harmless.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Drop `name` if present, create it empty and make it the active schema.
    ///
    /// The default issues server-style DDL through `execute`; every failure is
    /// fatal.
    fn reset_database(&mut self, name: &str) -> Result<()> {
        validate_database_name(name)?;
        for sql in [
            format!("DROP DATABASE IF EXISTS {name}"),
            format!("CREATE DATABASE {name}"),
            format!("USE {name}"),
        ] {
            self.execute(&sql)
                .map_err(|e| SrhError::connection("reset_database", e.message()))?;
        }
        Ok(())
    }
}

impl<C: TargetConnection + ?Sized> TargetConnection for &mut C {
    fn execute(&mut self, sql: &str) -> std::result::Result<(), ExecError> {
        (**self).execute(sql)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn reset_database(&mut self, name: &str) -> Result<()> {
        (**self).reset_database(name)
    }
}

/// Database names end up in DDL and file names, so only `[A-Za-z0-9_]+` passes.
pub fn validate_database_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SrhError::InvalidConfig {
            details: "target database name must not be empty".to_string(),
        });
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(SrhError::InvalidConfig {
            details: format!("target database name {name:?} must match [A-Za-z0-9_]+"),
        });
    }
    Ok(())
}

/// Owns a connection for one run and closes it on every exit path.
pub struct ConnectionGuard<C: TargetConnection> {
    conn: C,
}

impl<C: TargetConnection> ConnectionGuard<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Close explicitly and surface the close error, if any.
    pub fn close(mut self) -> Result<()> {
        self.conn.close()
    }
}

impl<C: TargetConnection> Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.conn
    }
}

impl<C: TargetConnection> DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.conn
    }
}

impl<C: TargetConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if self.conn.is_open() {
            let _ = self.conn.close();
        }
    }
}
