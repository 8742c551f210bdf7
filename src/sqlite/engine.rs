//! Read-only SQLite execution engine
//!
//! Every call opens a fresh connection to the database file with
//! `SQLITE_OPEN_READ_ONLY` and `PRAGMA query_only`, and runs on the blocking
//! thread pool. A progress handler aborts the running statement once the
//! deadline passes, whenever the statement started; the interrupt handle
//! also fires when the async side gives up waiting. Connections are never
//! shared between calls.

use crate::backend::DatabaseBackend;
use crate::config::DEFAULT_MAX_VALUE_BYTES;
use crate::error::{ErrorKind, Result, SqlGuardError};
use crate::result::{ExecutionResult, Row, ScalarValue};
use crate::schema::SchemaSnapshot;
use crate::sql::{lexer, RewrittenStatement};
use async_trait::async_trait;
use rusqlite::limits::Limit;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::introspect;

/// Virtual machine instructions between deadline checks.
const PROGRESS_INTERVAL_OPS: i32 = 1000;

/// SQLite backend bound to one database file.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    max_value_bytes: usize,
}

impl SqliteBackend {
    /// Create a backend for the database at `path`.
    ///
    /// Nothing is opened until the first call; a missing file surfaces as
    /// `SchemaUnavailable` on introspection.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }

    /// Cap the size of any string or blob a statement may build.
    ///
    /// Larger values fail the statement with `ExecutionFailed`.
    pub fn with_max_value_bytes(mut self, max_value_bytes: usize) -> Self {
        self.max_value_bytes = max_value_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }

    /// Run `f` on a fresh read-only connection, aborting it after `timeout`.
    async fn with_connection<T, F>(&self, timeout: Duration, open_kind: ErrorKind, f: F) -> Result<T>
    where
        F: FnOnce(&Connection, Instant) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = open_read_only(&self.path).map_err(|e| {
            SqlGuardError::pipeline(
                open_kind,
                format!("cannot open {}: {}", self.path.display(), e),
            )
        })?;
        let interrupt = conn.get_interrupt_handle();
        let deadline = Instant::now() + timeout;

        let length = i32::try_from(self.max_value_bytes).unwrap_or(i32::MAX);
        conn.set_limit(Limit::SQLITE_LIMIT_LENGTH, length);
        // The interrupt below is lost if it lands before the worker starts a
        // statement, so the statement also checks the deadline itself.
        conn.progress_handler(
            PROGRESS_INTERVAL_OPS,
            Some(move || Instant::now() >= deadline),
        );

        let mut task = tokio::task::spawn_blocking(move || f(&conn, deadline));

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined
                .map_err(|e| SqlGuardError::Internal(format!("SQLite worker failed: {}", e)))?,
            Err(_) => {
                interrupt.interrupt();
                // Wait for the interrupted statement to unwind and release the connection.
                if let Err(e) = task.await {
                    warn!(error = %e, "SQLite worker failed after interrupt");
                }
                Err(timeout_error(timeout))
            }
        }
    }
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    #[instrument(skip(self), fields(db = %self.path.display()))]
    async fn introspect(&self, sample_rows: usize, timeout: Duration) -> Result<SchemaSnapshot> {
        let snapshot = self
            .with_connection(timeout, ErrorKind::SchemaUnavailable, move |conn, _| {
                introspect::read_schema(conn, sample_rows)
            })
            .await
            .map_err(|e| SqlGuardError::from(e.classify(ErrorKind::SchemaUnavailable)))?;

        info!(tables = snapshot.tables.len(), "Schema captured");
        Ok(snapshot)
    }

    #[instrument(skip(self, statement), fields(db = %self.path.display(), sql = %statement.sql))]
    async fn execute(
        &self,
        statement: &RewrittenStatement,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let statement = statement.clone();
        let result = self
            .with_connection(timeout, ErrorKind::ExecutionFailed, move |conn, deadline| {
                run_statement(conn, &statement, deadline)
            })
            .await?;

        info!(
            row_count = result.row_count,
            truncated = result.truncated,
            execution_ms = result.execution_ms,
            "Statement executed"
        );
        Ok(result)
    }
}

/// Open `path` so that no write can reach the storage engine.
///
/// URI filenames are not enabled, so a path cannot smuggle `mode=rw`.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.pragma_update(None, "query_only", true)?;
    Ok(conn)
}

/// Execute exactly one statement and materialize at most `row_cap` rows.
pub(crate) fn run_statement(
    conn: &Connection,
    statement: &RewrittenStatement,
    deadline: Instant,
) -> Result<ExecutionResult> {
    let start = Instant::now();
    let sql = statement.lookahead_sql();

    match lexer::count_statements(sql) {
        0 => {
            return Err(SqlGuardError::pipeline(
                ErrorKind::EmptyInput,
                "no statement to execute",
            ))
        }
        1 => {}
        n => {
            return Err(SqlGuardError::pipeline(
                ErrorKind::MultiStatement,
                format!("refusing to submit {} statements", n),
            ))
        }
    }

    let mut stmt = conn.prepare(sql).map_err(engine_error)?;
    if !stmt.readonly() {
        return Err(SqlGuardError::pipeline(
            ErrorKind::ForbiddenOperation,
            "statement would modify the database",
        ));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let column_count = columns.len();
    let row_cap = statement.row_cap;

    let mut rows = Vec::new();
    let mut truncated = false;
    let mut cursor = stmt.query([]).map_err(engine_error)?;
    while let Some(row) = cursor.next().map_err(engine_error)? {
        if rows.len() >= row_cap {
            truncated = true;
            debug!(row_cap, "Result truncated at row cap");
            break;
        }
        if Instant::now() > deadline {
            return Err(SqlGuardError::pipeline(
                ErrorKind::Timeout,
                "execution deadline passed while reading rows",
            ));
        }
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(ScalarValue::from_sqlite(row.get_ref(i).map_err(engine_error)?));
        }
        rows.push(Row { values });
    }

    let row_count = rows.len();
    Ok(ExecutionResult {
        columns,
        rows,
        row_count,
        statement: statement.sql.clone(),
        truncated,
        execution_ms: start.elapsed().as_millis() as u64,
    })
}

/// Classify an engine error, keeping SQLite's message as the detail.
fn engine_error(e: rusqlite::Error) -> SqlGuardError {
    let kind = match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::OperationInterrupted => {
            ErrorKind::Timeout
        }
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ReadOnly => {
            ErrorKind::ForbiddenOperation
        }
        rusqlite::Error::MultipleStatement => ErrorKind::MultiStatement,
        _ => ErrorKind::ExecutionFailed,
    };
    SqlGuardError::pipeline(kind, e.to_string())
}

fn timeout_error(timeout: Duration) -> SqlGuardError {
    SqlGuardError::pipeline(
        ErrorKind::Timeout,
        format!("execution exceeded {} ms and was interrupted", timeout.as_millis()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{SqlValidator, StatementRewriter};
    use tempfile::TempDir;

    /// Seed a database through a writable connection and return a backend for it.
    fn setup_test_backend(rows: usize) -> (TempDir, SqliteBackend) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE events (id INTEGER PRIMARY KEY, status TEXT NOT NULL, amount REAL, payload BLOB);",
        )
        .unwrap();
        for i in 0..rows {
            conn.execute(
                "INSERT INTO events (id, status, amount, payload) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![i as i64, "ok", (i as f64) * 1.5, vec![0u8, 1, 2]],
            )
            .unwrap();
        }
        drop(conn);
        (dir, SqliteBackend::new(path))
    }

    fn rewritten(sql: &str, ceiling: usize) -> RewrittenStatement {
        let accepted = SqlValidator::new()
            .validate(sql, &SchemaSnapshot::default())
            .into_result()
            .unwrap();
        StatementRewriter::new(ceiling).rewrite(&accepted)
    }

    fn raw(sql: &str) -> RewrittenStatement {
        RewrittenStatement {
            sql: sql.to_string(),
            lookahead_sql: sql.to_string(),
            row_cap: 10,
            ceiling_applied: false,
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_basic_select() {
        let (_dir, backend) = setup_test_backend(5);
        let result = backend
            .execute(&rewritten("SELECT * FROM events", 100), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(result.row_count, 5);
        assert!(!result.truncated);
        assert_eq!(result.columns, vec!["id", "status", "amount", "payload"]);
        assert_eq!(result.statement, "SELECT * FROM events LIMIT 100");
    }

    #[tokio::test]
    async fn test_value_kinds() {
        let (_dir, backend) = setup_test_backend(2);
        let result = backend
            .execute(
                &rewritten("SELECT id, status, amount, payload, NULL AS nothing FROM events WHERE id = 1", 10),
                TIMEOUT,
            )
            .await
            .unwrap();
        let row = &result.rows[0].values;
        assert_eq!(row[0], ScalarValue::Integer(1));
        assert_eq!(row[1], ScalarValue::Text("ok".into()));
        assert_eq!(row[2], ScalarValue::Real(1.5));
        assert_eq!(row[3], ScalarValue::Text("AAEC".into()));
        assert!(row[4].is_null());
    }

    #[tokio::test]
    async fn test_truncation_flag() {
        let (_dir, backend) = setup_test_backend(20);

        let capped = backend
            .execute(&rewritten("SELECT id FROM events", 5), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(capped.row_count, 5);
        assert!(capped.truncated);
        assert_eq!(capped.statement, "SELECT id FROM events LIMIT 5");

        let exact = backend
            .execute(&rewritten("SELECT id FROM events", 20), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(exact.row_count, 20);
        assert!(!exact.truncated);
    }

    #[tokio::test]
    async fn test_user_limit_below_ceiling_not_truncated() {
        let (_dir, backend) = setup_test_backend(20);
        let result = backend
            .execute(&rewritten("SELECT id FROM events LIMIT 3", 10), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(result.row_count, 3);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_missing_column_is_execution_failed() {
        let (_dir, backend) = setup_test_backend(1);
        let err = backend
            .execute(&rewritten("SELECT nope FROM events", 10), TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ExecutionFailed));
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_write_refused_before_stepping() {
        let (_dir, backend) = setup_test_backend(1);
        let err = backend
            .execute(&raw("DELETE FROM events"), TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ForbiddenOperation));

        let conn = open_read_only(backend.path()).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_connection_refuses_writes() {
        let (_dir, backend) = setup_test_backend(1);
        let conn = open_read_only(backend.path()).unwrap();
        assert!(conn.execute("DELETE FROM events", []).is_err());
        assert!(conn.execute_batch("CREATE TABLE x (a)").is_err());
    }

    #[tokio::test]
    async fn test_multi_statement_refused() {
        let (_dir, backend) = setup_test_backend(1);
        let err = backend
            .execute(&raw("SELECT 1; SELECT 2"), TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::MultiStatement));
    }

    #[tokio::test]
    async fn test_timeout_interrupts_query() {
        let (_dir, backend) = setup_test_backend(1);
        let statement = rewritten(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
            10,
        );
        let started = Instant::now();
        let err = backend
            .execute(&statement, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_holds_when_interrupt_lands_early() {
        let (_dir, backend) = setup_test_backend(1);
        let statement = rewritten(
            "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT count(*) FROM c",
            10,
        );
        for _ in 0..50 {
            let outcome = tokio::time::timeout(
                Duration::from_secs(5),
                backend.execute(&statement, Duration::from_nanos(1)),
            )
            .await
            .expect("unbounded statement outlived its deadline");
            assert_eq!(outcome.unwrap_err().kind(), Some(ErrorKind::Timeout));
        }
    }

    #[tokio::test]
    async fn test_oversized_value_is_refused() {
        let (_dir, backend) = setup_test_backend(1);
        let backend = backend.with_max_value_bytes(1_000_000);

        let err = backend
            .execute(&rewritten("SELECT zeroblob(2000000) AS big", 10), TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ExecutionFailed));

        let err = backend
            .execute(&rewritten("SELECT length(hex(zeroblob(600000))) AS n", 10), TIMEOUT)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ExecutionFailed));

        let small = backend
            .execute(&rewritten("SELECT length(zeroblob(1000)) AS n", 10), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(small.rows[0].values[0], ScalarValue::Integer(1000));
    }

    #[tokio::test]
    async fn test_missing_database() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::new(dir.path().join("absent.db"));
        let err = backend.introspect(3, TIMEOUT).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::SchemaUnavailable));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_introspect_through_backend() {
        let (_dir, backend) = setup_test_backend(4);
        let schema = backend.introspect(2, TIMEOUT).await.unwrap();
        let table = schema.table("events").unwrap();
        assert_eq!(table.row_count, 4);
        assert_eq!(table.sample_rows.len(), 2);
    }
}
