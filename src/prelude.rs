//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use sql_repro_harness::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SrhError};

// Logging
pub use crate::logger::jsonl::{EventSink, JsonlWriter, LogEntry, MemorySink, NullSink};

// Replay
#[cfg(feature = "sqlite")]
pub use crate::replay::harness::run_replay;
pub use crate::replay::harness::{ReplayReport, ReplayStatus, StatementFailure, replay};
pub use crate::replay::log_parser::{LogFormat, ReplayLog, Statement, parse_log};
#[cfg(feature = "sqlite")]
pub use crate::replay::sqlite_target::SqliteTarget;
pub use crate::replay::target::{ConnectionGuard, ExecError, TargetConnection};

// Pairwise
pub use crate::pairwise::catalog::OptionCatalog;
pub use crate::pairwise::generator::{
    OptionPair, WeightRange, WeightedPair, assign_weight, generate_pairs,
};
pub use crate::pairwise::sampler::WeightedPairSampler;
pub use crate::pairwise::table::{GenerateSummary, WeightTable, run_generate};
