#![forbid(unsafe_code)]

//! SQL Repro Harness (srh): tooling for configuration fuzzing of a relational
//! database engine.
//!
//! Two independent halves:
//! 1. **Replay harness**: pull the SQL block out of a captured failure log,
//!    reset the target database and re-run every statement, recording each
//!    failure without stopping the run
//! 2. **Pairwise weights**: enumerate every unordered pair of tunable options
//!    and give each a sampling weight for an external test generator
//!
//! # Library usage
//!
//! ```rust,no_run
//! use sql_repro_harness::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use sql_repro_harness::replay::log_parser::parse_log;
//! use sql_repro_harness::pairwise::generator::generate_pairs;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod pairwise;
pub mod replay;
