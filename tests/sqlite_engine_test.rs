//! Validate → rewrite → execute against real SQLite files

mod common;

use common::{count_rows, numbers_db, sales_db};
use proptest::prelude::*;
use sqlguard::sqlite::open_read_only;
use sqlguard::{
    DatabaseBackend, ErrorKind, RewrittenStatement, SchemaSnapshot, SqlValidator, SqliteBackend,
    StatementRewriter,
};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn prepare(sql: &str, ceiling: usize) -> RewrittenStatement {
    let verdict = SqlValidator::new().validate(sql, &SchemaSnapshot::default());
    let accepted = verdict.accepted().expect("statement should be accepted");
    StatementRewriter::new(ceiling).rewrite(accepted)
}

#[tokio::test]
async fn test_rows_under_ceiling_are_all_returned() {
    let (_dir, db) = numbers_db(40);
    let backend = SqliteBackend::new(&db);

    let result = backend
        .execute(&prepare("SELECT n FROM numbers ORDER BY n", 50), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.row_count, 40);
    assert!(!result.truncated);
    assert_eq!(result.columns, vec!["n".to_string()]);
}

#[tokio::test]
async fn test_rows_over_ceiling_are_capped_and_flagged() {
    let (_dir, db) = numbers_db(120);
    let backend = SqliteBackend::new(&db);

    let result = backend
        .execute(&prepare("SELECT n FROM numbers ORDER BY n", 50), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.row_count, 50);
    assert!(result.truncated);
    assert_eq!(result.statement, "SELECT n FROM numbers ORDER BY n LIMIT 50");
    assert_eq!(result.rows.last().unwrap().values[0].as_i64(), Some(49));
}

#[tokio::test]
async fn test_exactly_ceiling_rows_is_not_truncated() {
    let (_dir, db) = numbers_db(50);
    let backend = SqliteBackend::new(&db);

    let result = backend
        .execute(&prepare("SELECT n FROM numbers", 50), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.row_count, 50);
    assert!(!result.truncated);
}

#[tokio::test]
async fn test_oversized_user_limit_is_lowered() {
    let (_dir, db) = numbers_db(300);
    let backend = SqliteBackend::new(&db);

    let statement = prepare("SELECT n FROM numbers LIMIT 250", 100);
    assert!(statement.ceiling_applied);
    let result = backend.execute(&statement, TIMEOUT).await.unwrap();

    assert_eq!(result.row_count, 100);
    assert!(result.truncated);
}

#[tokio::test]
async fn test_offset_form_is_honored() {
    let (_dir, db) = numbers_db(30);
    let backend = SqliteBackend::new(&db);

    let result = backend
        .execute(&prepare("SELECT n FROM numbers ORDER BY n LIMIT 20, 5", 100), TIMEOUT)
        .await
        .unwrap();

    let values: Vec<_> = result.rows.iter().map(|r| r.values[0].as_i64()).collect();
    assert_eq!(values, vec![Some(20), Some(21), Some(22), Some(23), Some(24)]);
}

#[test]
fn test_read_only_connection_refuses_every_write() {
    let (_dir, db) = sales_db();
    let conn = open_read_only(&db).unwrap();

    for sql in [
        "DELETE FROM sales_data",
        "UPDATE sales_data SET amount = 0",
        "INSERT INTO users (name) VALUES ('mallory')",
        "DROP TABLE users",
        "CREATE TABLE evil (x)",
    ] {
        assert!(conn.execute(sql, []).is_err(), "{} should fail", sql);
    }

    assert_eq!(count_rows(&db, "sales_data"), 50);
    assert_eq!(count_rows(&db, "users"), 2);
}

#[tokio::test]
async fn test_introspection_lists_user_tables() {
    let (_dir, db) = sales_db();
    let backend = SqliteBackend::new(&db);

    let schema = backend.introspect(2, TIMEOUT).await.unwrap();

    let names: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["sales_data", "users"]);
    let sales = &schema.tables[0];
    assert_eq!(sales.row_count, 50);
    assert_eq!(sales.sample_rows.len(), 2);
    assert!(sales.columns.iter().any(|c| c.name == "region"));
}

#[tokio::test]
async fn test_backend_reports_engine_errors() {
    let (_dir, db) = sales_db();
    let backend = SqliteBackend::new(&db);

    let err = backend
        .execute(&prepare("SELECT * FROM no_such_table", 10), TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::ExecutionFailed));
    assert!(err.to_string().contains("no_such_table"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Row count never exceeds the ceiling, and truncation is reported
    /// exactly when the table held more rows than the ceiling.
    #[test]
    fn prop_row_cap_holds(rows in 0usize..60, ceiling in 1usize..40) {
        let (_dir, db) = numbers_db(rows);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let backend = SqliteBackend::new(&db);

        let result = runtime
            .block_on(backend.execute(&prepare("SELECT n FROM numbers", ceiling), TIMEOUT))
            .unwrap();

        prop_assert_eq!(result.row_count, rows.min(ceiling));
        prop_assert_eq!(result.truncated, rows > ceiling);
    }
}
