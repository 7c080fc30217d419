//! SRH-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SrhError>;

/// Top-level error type for the replay harness and weight generator.
#[derive(Debug, Error)]
pub enum SrhError {
    #[error("[SRH-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SRH-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SRH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SRH-2001] file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("[SRH-2002] malformed weight table {path} at line {line}: {details}")]
    WeightTableParse {
        path: PathBuf,
        line: usize,
        details: String,
    },

    #[error("[SRH-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SRH-2102] target connection failure in {context}: {details}")]
    Connection {
        context: &'static str,
        details: String,
    },

    #[error("[SRH-2103] statement {position} failed: {details}")]
    Statement { position: usize, details: String },

    #[error("[SRH-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SrhError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SRH-1001",
            Self::MissingConfig { .. } => "SRH-1002",
            Self::ConfigParse { .. } => "SRH-1003",
            Self::NotFound { .. } => "SRH-2001",
            Self::WeightTableParse { .. } => "SRH-2002",
            Self::Serialization { .. } => "SRH-2101",
            Self::Connection { .. } => "SRH-2102",
            Self::Statement { .. } => "SRH-2103",
            Self::Io { .. } => "SRH-3002",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Connection { .. })
    }

    /// Whether the error aborts a replay run instead of being recorded.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Statement { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for fatal target errors.
    #[must_use]
    pub fn connection(context: &'static str, details: impl Into<String>) -> Self {
        Self::Connection {
            context,
            details: details.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SrhError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Connection {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for SrhError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SrhError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SrhError> {
        vec![
            SrhError::InvalidConfig {
                details: String::new(),
            },
            SrhError::MissingConfig {
                path: PathBuf::new(),
            },
            SrhError::ConfigParse {
                context: "",
                details: String::new(),
            },
            SrhError::NotFound {
                path: PathBuf::new(),
            },
            SrhError::WeightTableParse {
                path: PathBuf::new(),
                line: 0,
                details: String::new(),
            },
            SrhError::Serialization {
                context: "",
                details: String::new(),
            },
            SrhError::Connection {
                context: "",
                details: String::new(),
            },
            SrhError::Statement {
                position: 0,
                details: String::new(),
            },
            SrhError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(SrhError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_srh_prefix() {
        for err in &all_variants() {
            assert!(
                err.code().starts_with("SRH-"),
                "code {} must start with SRH-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = SrhError::NotFound {
            path: PathBuf::from("/tmp/database0.log"),
        };
        let msg = err.to_string();
        assert!(msg.contains("SRH-2001"), "display should contain code: {msg}");
        assert!(
            msg.contains("database0.log"),
            "display should contain path: {msg}"
        );
    }

    #[test]
    fn not_found_does_not_assume_a_replay_log() {
        let msg = SrhError::NotFound {
            path: PathBuf::from("weights.txt"),
        }
        .to_string();
        assert_eq!(msg, "[SRH-2001] file not found: weights.txt");
    }

    #[test]
    fn only_statement_errors_are_recoverable() {
        for err in all_variants() {
            let recoverable = matches!(err, SrhError::Statement { .. });
            assert_eq!(err.is_fatal(), !recoverable, "{}", err.code());
        }
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(SrhError::connection("reset", "gone away").is_retryable());
        assert!(SrhError::io("/tmp/x", std::io::Error::other("test")).is_retryable());
        assert!(
            !SrhError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !SrhError::NotFound {
                path: PathBuf::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = SrhError::io(
            "/tmp/weights.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code(), "SRH-3002");
        assert!(err.to_string().contains("/tmp/weights.txt"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn from_rusqlite_error_is_connection_failure() {
        let sql_err =
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some("test".to_string()));
        let err: SrhError = sql_err.into();
        assert_eq!(err.code(), "SRH-2102");
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SrhError = json_err.into();
        assert_eq!(err.code(), "SRH-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: SrhError = toml_err.into();
        assert_eq!(err.code(), "SRH-1003");
    }
}
