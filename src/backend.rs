//! Database capability interface
//!
//! The validator, rewriter and orchestrator only talk to a database through
//! [`DatabaseBackend`]. Each call opens its own read-only connection, so a
//! backend can be shared freely between concurrent queries.

use crate::error::Result;
use crate::result::ExecutionResult;
use crate::schema::SchemaSnapshot;
use crate::sql::RewrittenStatement;
use async_trait::async_trait;
use std::time::Duration;

/// A database the pipeline can introspect and query.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Short engine name used in logs.
    fn name(&self) -> &str;

    /// Capture a fresh schema snapshot.
    ///
    /// Fails with `SchemaUnavailable` when the database cannot be opened or
    /// has no user tables.
    async fn introspect(&self, sample_rows: usize, timeout: Duration) -> Result<SchemaSnapshot>;

    /// Execute one rewritten statement on a read-only connection.
    ///
    /// Only statements produced by the rewriter are accepted, which in turn
    /// only accepts validated statements.
    async fn execute(
        &self,
        statement: &RewrittenStatement,
        timeout: Duration,
    ) -> Result<ExecutionResult>;
}
