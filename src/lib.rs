#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # sqlguard
//!
//! sqlguard answers natural-language questions against an existing SQLite
//! database by asking a language model for SQL, and treats that SQL as
//! untrusted input. Nothing reaches the database until it has been checked,
//! bounded and handed to a connection that cannot write.
//!
//! ## Pipeline
//!
//! ```text
//! introspect → generate (LLM) → validate → rewrite → execute → interpret (LLM)
//! ```
//!
//! - **Validation** ([`SqlValidator`]): one statement, `SELECT`/`WITH` only,
//!   denylisted keywords anywhere, dangerous functions and system catalogs.
//!   Comments are stripped first so they cannot hide anything.
//! - **Rewriting** ([`StatementRewriter`]): the outermost query always carries
//!   a `LIMIT` no larger than the configured ceiling.
//! - **Execution** ([`SqliteBackend`]): read-only open flags, `PRAGMA
//!   query_only`, a per-statement read-only check, an interrupting timeout and
//!   a bounded, typed result.
//!
//! Every failure is a [`PipelineError`] with one of eight [`ErrorKind`]s; no
//! stage panics or silently drops an error.
//!
//! ## Library Usage
//!
//! ```no_run
//! use sqlguard::{LlmConfig, Pipeline, PipelineConfig};
//!
//! # async fn demo() -> sqlguard::Result<()> {
//! let llm = LlmConfig {
//!     api_key: std::env::var("SQLGUARD_API_KEY").ok(),
//!     ..LlmConfig::default()
//! };
//! let pipeline = Pipeline::with_llm(PipelineConfig::default(), llm)?;
//!
//! let outcome = pipeline
//!     .run_query("sales.db", "Total sales per region?")
//!     .await;
//! match (&outcome.result, &outcome.error) {
//!     (Some(result), _) => println!("{} rows", result.row_count),
//!     (None, Some(error)) => eprintln!("{}", error),
//!     (None, None) => {}
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Validating SQL Directly
//!
//! ```
//! use sqlguard::{ErrorKind, SchemaSnapshot, SqlValidator, StatementRewriter};
//!
//! let schema = SchemaSnapshot::default();
//! let verdict = SqlValidator::new().validate("DELETE FROM sales_data", &schema);
//! assert_eq!(verdict.rejection().map(|e| e.kind), Some(ErrorKind::ForbiddenOperation));
//!
//! let accepted = SqlValidator::new()
//!     .validate("SELECT * FROM sales_data", &schema)
//!     .into_result()
//!     .unwrap();
//! let rewritten = StatementRewriter::new(100).rewrite(&accepted);
//! assert_eq!(rewritten.sql, "SELECT * FROM sales_data LIMIT 100");
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod result;
pub mod schema;
pub mod sql;
pub mod sqlite;

pub use backend::DatabaseBackend;
pub use config::{ConfigFile, LlmConfig, PipelineConfig};
pub use error::{ErrorHint, ErrorKind, PipelineError, Result, SqlGuardError};
pub use llm::{
    FixedSqlGenerator, GenerationRequest, InterpretationRequest, LlmInterpreter, LlmProvider,
    LlmSqlGenerator, OpenAiCompatibleProvider, ResultInterpreter, SqlGenerator,
    SummaryInterpreter,
};
pub use pipeline::{
    HistoryEntry, Orchestrator, Pipeline, PipelineState, QueryHistory, QueryOutcome, Stage,
};
pub use result::{ExecutionResult, Row, ScalarValue};
pub use schema::{ColumnDescriptor, SchemaSnapshot, TableDescriptor};
pub use sql::{
    extract_sql, AcceptedStatement, RewrittenStatement, SqlValidator, StatementRewriter,
    ValidationVerdict,
};
pub use sqlite::SqliteBackend;
