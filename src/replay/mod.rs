//! Log replay harness: extract the SQL block from a captured failure log, reset
//! the target database and re-run every statement with per-statement fault
//! isolation.

pub mod harness;
pub mod log_parser;
#[cfg(feature = "sqlite")]
pub mod sqlite_target;
pub mod target;
