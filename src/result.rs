//! Execution results
//!
//! Every value leaving the engine is one of the [`ScalarValue`] kinds; no
//! driver-native types reach callers.

use base64::Engine;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ScalarValue {
    /// Convert a SQLite value. Blobs become base64 text.
    pub fn from_sqlite(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => ScalarValue::Null,
            ValueRef::Integer(n) => ScalarValue::Integer(n),
            ValueRef::Real(f) => ScalarValue::Real(f),
            ValueRef::Text(s) => ScalarValue::Text(String::from_utf8_lossy(s).into_owned()),
            ValueRef::Blob(b) => {
                ScalarValue::Text(base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(n) => Some(*n),
            ScalarValue::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Integer(n) => Some(*n as f64),
            ScalarValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form used in prompts and CLI output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Null => serde_json::Value::Null,
            ScalarValue::Boolean(b) => serde_json::Value::Bool(*b),
            ScalarValue::Integer(n) => serde_json::Value::from(*n),
            ScalarValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ScalarValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Boolean(b) => write!(f, "{}", b),
            ScalarValue::Integer(n) => write!(f, "{}", n),
            ScalarValue::Real(x) => write!(f, "{}", x),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

/// One result row, positionally aligned with [`ExecutionResult::columns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<ScalarValue>,
}

/// Bounded, fully materialized result of one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Materialized rows, never more than the configured ceiling.
    pub rows: Vec<Row>,
    /// Number of rows in `rows`.
    pub row_count: usize,
    /// The rewritten statement text that was executed.
    pub statement: String,
    /// True iff the query produced more rows than the cap allowed.
    pub truncated: bool,
    /// Wall-clock execution time in milliseconds.
    pub execution_ms: u64,
}

impl ExecutionResult {
    /// Index of a column by name (first match, case-insensitive).
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&ScalarValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.values.get(idx)
    }

    /// Rows as column-name → value objects.
    pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.records_limited(self.rows.len())
    }

    /// The first `limit` rows as column-name → value objects.
    pub fn records_limited(&self, limit: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(&row.values)
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }

    /// Deterministic plain-text rendering of the result.
    ///
    /// Shows at most `max_rows` rows followed by a count of the rows left out.
    pub fn summary(&self, max_rows: usize) -> String {
        if self.row_count == 0 {
            return "Query succeeded but returned no rows.".to_string();
        }

        let mut out = Vec::new();
        out.push(format!("Query succeeded, {} row(s) returned.", self.row_count));
        if self.truncated {
            out.push(format!(
                "Result was capped at {} rows; more rows matched.",
                self.row_count
            ));
        }
        out.push(format!("Columns: {}", self.columns.join(", ")));
        out.push("-".repeat(60));

        for (i, row) in self.rows.iter().take(max_rows).enumerate() {
            out.push(format!("Row {}:", i + 1));
            for (name, value) in self.columns.iter().zip(&row.values) {
                out.push(format!("  {}: {}", name, value));
            }
        }

        if self.row_count > max_rows {
            out.push(format!("... ({} more rows not shown)", self.row_count - max_rows));
        }

        out.join("\n")
    }
}
