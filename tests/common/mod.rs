//! Shared helpers for integration tests
//!
//! Databases are seeded through a writable connection owned by the test;
//! the code under test only ever opens them read-only.

#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::{params, Connection};
use sqlguard::{
    GenerationRequest, HistoryEntry, InterpretationRequest, Result, ResultInterpreter,
    SqlGenerator, SqlGuardError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const REGIONS: [&str; 5] = ["north", "south", "east", "west", "central"];

/// `sales_data` with 50 rows spread evenly over five regions.
pub fn sales_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sales.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales_data (
            id INTEGER PRIMARY KEY,
            region TEXT NOT NULL,
            product TEXT NOT NULL,
            amount REAL NOT NULL,
            sale_date TEXT
        );
        CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
        INSERT INTO users (name) VALUES ('ada'), ('grace');",
    )
    .unwrap();
    for i in 0..50i64 {
        conn.execute(
            "INSERT INTO sales_data (id, region, product, amount, sale_date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                i,
                REGIONS[(i % 5) as usize],
                format!("product-{}", i % 7),
                (i as f64) * 10.0,
                format!("2024-01-{:02}", (i % 28) + 1)
            ],
        )
        .unwrap();
    }
    (dir, path)
}

/// `numbers(n)` holding `0..rows`.
pub fn numbers_db(rows: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("numbers.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE numbers (n INTEGER NOT NULL)")
        .unwrap();
    let tx = conn.unchecked_transaction().unwrap();
    for n in 0..rows {
        tx.execute("INSERT INTO numbers (n) VALUES (?1)", [n as i64])
            .unwrap();
    }
    tx.commit().unwrap();
    (dir, path)
}

/// Row count of `table`, read through a separate connection.
pub fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

/// What the scripted generator does for one question.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

/// Generator answering from a fixed question → reply table.
///
/// Unknown questions are answered with the question itself, so a test can
/// pass SQL directly as the "question".
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: HashMap<String, Reply>,
    pub seen_history: Mutex<Vec<Vec<HistoryEntry>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, question: &str, reply: Reply) -> Self {
        self.replies.insert(question.to_string(), reply);
        self
    }

    pub fn sql(self, question: &str, sql: &str) -> Self {
        self.reply(question, Reply::Text(sql.to_string()))
    }
}

#[async_trait]
impl SqlGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        self.seen_history
            .lock()
            .unwrap()
            .push(request.history.to_vec());

        match self.replies.get(request.question) {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail(msg)) => Err(SqlGuardError::Network(msg.clone())),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
            None => Ok(request.question.to_string()),
        }
    }
}

/// Interpreter that echoes the row count, or fails on demand.
pub struct EchoInterpreter {
    pub fail: bool,
}

#[async_trait]
impl ResultInterpreter for EchoInterpreter {
    async fn interpret(&self, request: &InterpretationRequest<'_>) -> Result<String> {
        if self.fail {
            return Err(SqlGuardError::Network("interpreter unavailable".into()));
        }
        Ok(format!("{} rows", request.result.row_count))
    }
}
