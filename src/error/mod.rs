//! Error types for sqlguard
//!
//! Two layers live here:
//!
//! - [`ErrorKind`] / [`PipelineError`]: the closed taxonomy surfaced to callers
//!   of the query pipeline. Every failed query carries exactly one of these.
//! - [`SqlGuardError`]: the crate-wide error used by fallible operations
//!   (configuration loading, I/O, HTTP, SQLite). Stage boundaries convert it
//!   into a [`PipelineError`] with [`SqlGuardError::kind_or`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod hints;

pub use hints::ErrorHint;

/// Result type alias for sqlguard operations
pub type Result<T> = std::result::Result<T, SqlGuardError>;

/// Kind of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The candidate statement was empty (or only comments / a separator).
    EmptyInput,
    /// More than one statement was submitted.
    MultiStatement,
    /// A non-read-only verb, denylisted keyword or dangerous object was found.
    ForbiddenOperation,
    /// The database could not be opened or has no tables.
    SchemaUnavailable,
    /// The text generator failed, timed out or returned nothing usable.
    GenerationFailed,
    /// The database engine rejected the statement.
    ExecutionFailed,
    /// Execution exceeded the configured timeout and was aborted.
    Timeout,
    /// The interpreter failed; execution results are still available.
    InterpretationFailed,
}

impl ErrorKind {
    /// All kinds, in taxonomy order.
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::EmptyInput,
        ErrorKind::MultiStatement,
        ErrorKind::ForbiddenOperation,
        ErrorKind::SchemaUnavailable,
        ErrorKind::GenerationFailed,
        ErrorKind::ExecutionFailed,
        ErrorKind::Timeout,
        ErrorKind::InterpretationFailed,
    ];

    /// Stable identifier, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::MultiStatement => "multi_statement",
            ErrorKind::ForbiddenOperation => "forbidden_operation",
            ErrorKind::SchemaUnavailable => "schema_unavailable",
            ErrorKind::GenerationFailed => "generation_failed",
            ErrorKind::ExecutionFailed => "execution_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InterpretationFailed => "interpretation_failed",
        }
    }

    /// True for kinds detected before anything reaches the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyInput | ErrorKind::MultiStatement | ErrorKind::ForbiddenOperation
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified pipeline failure with a human-readable detail string.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Main error type for sqlguard
#[derive(Error, Debug)]
pub enum SqlGuardError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SqlGuardError {
    /// Shorthand for a classified pipeline error.
    pub fn pipeline(kind: ErrorKind, detail: impl Into<String>) -> Self {
        SqlGuardError::Pipeline(PipelineError::new(kind, detail))
    }

    /// The taxonomy kind carried by this error, if it is already classified.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SqlGuardError::Pipeline(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Classify this error at a stage boundary.
    ///
    /// Already-classified errors keep their kind; anything else (network,
    /// I/O, serialization) is reported as `fallback` with its message as the
    /// detail.
    pub fn kind_or(self, fallback: ErrorKind) -> PipelineError {
        match self {
            SqlGuardError::Pipeline(e) => e,
            other => PipelineError::new(fallback, other.to_string()),
        }
    }

    /// Report this error as `kind` regardless of any existing classification.
    ///
    /// Used for collaborator failures, where whatever went wrong inside the
    /// generator or interpreter is a failure of that stage.
    pub fn classify(self, kind: ErrorKind) -> PipelineError {
        match self {
            SqlGuardError::Pipeline(e) => PipelineError::new(kind, e.detail),
            other => PipelineError::new(kind, other.to_string()),
        }
    }
}
