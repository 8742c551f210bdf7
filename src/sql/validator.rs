//! SQL safety validation
//!
//! [`SqlValidator::validate`] decides whether an untrusted candidate statement
//! may run. Checks run on the comment-stripped text, in order:
//!
//! 1. shape: non-empty, exactly one statement (one trailing `;` allowed)
//! 2. verb whitelist: `SELECT`, or `WITH` introducing a `SELECT`
//! 3. denylist: no write/DDL/administrative keyword anywhere
//! 4. identifier sanity: no system catalogs or dangerous functions
//!
//! Keyword checks only look at bare words, never inside string literals or
//! quoted identifiers. This is keyword scanning, not parsing; the read-only
//! connection in the engine is the independent second layer.

use super::lexer::{self, Token, TokenKind};
use crate::error::{ErrorKind, PipelineError};
use crate::schema::SchemaSnapshot;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Keywords rejected anywhere in a statement.
const DENYLIST: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "REPLACE", "ATTACH",
    "DETACH", "PRAGMA", "EXEC", "EXECUTE", "GRANT", "REVOKE", "VACUUM", "REINDEX",
];

/// Words that can start a top-level statement after a `WITH` clause.
const STATEMENT_VERBS: &[&str] = &["SELECT", "VALUES", "INSERT", "UPDATE", "DELETE", "REPLACE"];

/// Schema objects that expose or alter engine internals.
const SYSTEM_CATALOGS: &[&str] = &[
    "sqlite_master",
    "sqlite_schema",
    "sqlite_temp_master",
    "sqlite_temp_schema",
    "sqlite_sequence",
    "sqlite_stat1",
    "sqlite_stat2",
    "sqlite_stat3",
    "sqlite_stat4",
    "sqlite_dbpage",
    "sqlite_stmt",
    "dbstat",
];

/// Functions that reach outside the database file.
const DANGEROUS_FUNCTIONS: &[&str] = &[
    "load_extension",
    "readfile",
    "writefile",
    "edit",
    "fts3_tokenizer",
];

/// A statement that passed validation.
///
/// Only [`SqlValidator`] creates these, so holding one proves the text was
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AcceptedStatement(String);

impl AcceptedStatement {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AcceptedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of validating one candidate statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// Comment-stripped, trimmed statement without its trailing separator.
    Accepted { statement: AcceptedStatement },
    Rejected { error: PipelineError },
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted { .. })
    }

    pub fn accepted(&self) -> Option<&AcceptedStatement> {
        match self {
            ValidationVerdict::Accepted { statement } => Some(statement),
            ValidationVerdict::Rejected { .. } => None,
        }
    }

    pub fn rejection(&self) -> Option<&PipelineError> {
        match self {
            ValidationVerdict::Accepted { .. } => None,
            ValidationVerdict::Rejected { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<AcceptedStatement, PipelineError> {
        match self {
            ValidationVerdict::Accepted { statement } => Ok(statement),
            ValidationVerdict::Rejected { error } => Err(error),
        }
    }
}

/// Static safety validator for candidate SQL.
#[derive(Debug, Clone, Default)]
pub struct SqlValidator;

impl SqlValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `candidate` against `schema`.
    ///
    /// Pure: the same text and schema always produce the same verdict.
    pub fn validate(&self, candidate: &str, schema: &SchemaSnapshot) -> ValidationVerdict {
        match self.check(candidate, schema) {
            Ok(text) => ValidationVerdict::Accepted {
                statement: AcceptedStatement(text),
            },
            Err(error) => {
                debug!(kind = %error.kind, detail = %error.detail, "Candidate statement rejected");
                ValidationVerdict::Rejected { error }
            }
        }
    }

    fn check(&self, candidate: &str, schema: &SchemaSnapshot) -> Result<String, PipelineError> {
        let stripped = lexer::strip_comments(candidate);
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            return Err(reject(ErrorKind::EmptyInput, "candidate statement is empty"));
        }

        let tokens = lexer::tokenize(trimmed);
        let mut sig = lexer::significant(&tokens);
        let mut body = trimmed;

        if let Some(last) = sig.last().copied() {
            if last.kind == TokenKind::Semicolon {
                body = trimmed[..last.start].trim_end();
                sig.pop();
            }
        }

        let Some(first) = sig.first().copied() else {
            return Err(reject(
                ErrorKind::EmptyInput,
                "candidate statement contains only a statement separator",
            ));
        };

        if let Some(sep) = sig.iter().find(|t| t.kind == TokenKind::Semicolon) {
            return Err(reject(
                ErrorKind::MultiStatement,
                format!(
                    "statement separator ';' found at offset {} before the end of the statement; only one statement may be submitted",
                    sep.start
                ),
            ));
        }

        check_verb(first, &sig)?;
        check_denylist(&sig)?;
        check_identifiers(&sig, schema)?;

        Ok(body.to_string())
    }
}

fn reject(kind: ErrorKind, detail: impl Into<String>) -> PipelineError {
    PipelineError::new(kind, detail)
}

fn check_verb(first: Token<'_>, sig: &[Token<'_>]) -> Result<(), PipelineError> {
    if first.kind != TokenKind::Word {
        return Err(reject(
            ErrorKind::ForbiddenOperation,
            format!(
                "statement must begin with SELECT or WITH, found '{}'",
                first.text
            ),
        ));
    }

    let verb = first.text.to_ascii_uppercase();
    match verb.as_str() {
        "SELECT" => Ok(()),
        "WITH" => check_cte_target(sig),
        _ => Err(reject(
            ErrorKind::ForbiddenOperation,
            format!("{} statements are not allowed; only SELECT queries may run", verb),
        )),
    }
}

/// The statement a `WITH` clause introduces must itself be a query.
fn check_cte_target(sig: &[Token<'_>]) -> Result<(), PipelineError> {
    let depths = lexer::depths(sig);
    let target = sig
        .iter()
        .zip(&depths)
        .skip(1)
        .find(|(t, depth)| {
            **depth == 0
                && t.kind == TokenKind::Word
                && STATEMENT_VERBS.iter().any(|v| t.text.eq_ignore_ascii_case(v))
        })
        .map(|(t, _)| t.text.to_ascii_uppercase());

    match target.as_deref() {
        Some("SELECT") | Some("VALUES") => Ok(()),
        Some(verb) => Err(reject(
            ErrorKind::ForbiddenOperation,
            format!(
                "WITH clause introduces a {} statement; only SELECT queries may run",
                verb
            ),
        )),
        None => Err(reject(
            ErrorKind::ForbiddenOperation,
            "WITH clause does not introduce a SELECT query",
        )),
    }
}

fn check_denylist(sig: &[Token<'_>]) -> Result<(), PipelineError> {
    for (i, token) in sig.iter().enumerate() {
        if token.kind != TokenKind::Word {
            continue;
        }
        let Some(keyword) = DENYLIST
            .iter()
            .find(|k| token.text.eq_ignore_ascii_case(k))
        else {
            continue;
        };
        // replace(x, y, z) is a scalar function, REPLACE INTO is a write.
        if *keyword == "REPLACE" && next_is_call(sig, i) {
            continue;
        }
        return Err(reject(
            ErrorKind::ForbiddenOperation,
            format!("forbidden keyword {} found in statement", keyword),
        ));
    }
    Ok(())
}

fn check_identifiers(sig: &[Token<'_>], schema: &SchemaSnapshot) -> Result<(), PipelineError> {
    for (i, token) in sig.iter().enumerate() {
        let Some(name) = token.identifier() else {
            continue;
        };
        let lower = name.to_ascii_lowercase();

        if token.kind == TokenKind::Word
            && next_is_call(sig, i)
            && DANGEROUS_FUNCTIONS.contains(&lower.as_str())
        {
            return Err(reject(
                ErrorKind::ForbiddenOperation,
                format!("call to {}() is not allowed", lower),
            ));
        }

        let is_catalog =
            SYSTEM_CATALOGS.contains(&lower.as_str()) || lower.starts_with("pragma_");
        if is_catalog && !schema.contains_table(&name) {
            return Err(reject(
                ErrorKind::ForbiddenOperation,
                format!("system object {} may not be queried", name),
            ));
        }
    }
    Ok(())
}

fn next_is_call(sig: &[Token<'_>], i: usize) -> bool {
    sig.get(i + 1).is_some_and(|t| t.kind == TokenKind::LParen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableDescriptor;

    fn validate(sql: &str) -> ValidationVerdict {
        SqlValidator::new().validate(sql, &SchemaSnapshot::default())
    }

    fn rejected_kind(sql: &str) -> ErrorKind {
        validate(sql)
            .rejection()
            .map(|e| e.kind)
            .unwrap_or_else(|| panic!("expected rejection for {:?}", sql))
    }

    fn accepted_text(sql: &str) -> String {
        validate(sql)
            .accepted()
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| panic!("expected acceptance for {:?}", sql))
    }

    #[test]
    fn test_accepts_plain_select() {
        assert_eq!(
            accepted_text("  SELECT region, SUM(amount) FROM sales_data GROUP BY region ;  "),
            "SELECT region, SUM(amount) FROM sales_data GROUP BY region"
        );
    }

    #[test]
    fn test_accepts_lowercase_select() {
        assert!(validate("select * from t").is_accepted());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(rejected_kind(""), ErrorKind::EmptyInput);
        assert_eq!(rejected_kind("   \n\t"), ErrorKind::EmptyInput);
        assert_eq!(rejected_kind("-- just a comment"), ErrorKind::EmptyInput);
        assert_eq!(rejected_kind(" ; "), ErrorKind::EmptyInput);
    }

    #[test]
    fn test_multi_statement() {
        assert_eq!(
            rejected_kind("SELECT * FROM users; DROP TABLE users"),
            ErrorKind::MultiStatement
        );
        assert_eq!(rejected_kind("SELECT 1;;"), ErrorKind::MultiStatement);
        assert_eq!(rejected_kind("SELECT 1; SELECT 2"), ErrorKind::MultiStatement);
    }

    #[test]
    fn test_separator_hidden_by_comments() {
        assert_eq!(
            rejected_kind("SELECT 1 /* x */;/* y */ DROP TABLE t"),
            ErrorKind::MultiStatement
        );
        assert_eq!(
            rejected_kind("SELECT 1 -- trailing\n; DELETE FROM t"),
            ErrorKind::MultiStatement
        );
    }

    #[test]
    fn test_semicolon_in_string_is_fine() {
        assert_eq!(
            accepted_text("SELECT * FROM t WHERE note = 'a;b'"),
            "SELECT * FROM t WHERE note = 'a;b'"
        );
    }

    #[test]
    fn test_forbidden_leading_verbs() {
        for sql in [
            "DELETE FROM sales_data",
            "INSERT INTO t VALUES (1)",
            "UPDATE t SET a = 1",
            "DROP TABLE t",
            "ALTER TABLE t ADD COLUMN c",
            "CREATE TABLE x (a)",
            "TRUNCATE TABLE t",
            "REPLACE INTO t VALUES (1)",
            "ATTACH DATABASE 'x.db' AS x",
            "PRAGMA writable_schema = 1",
            "EXEC sp_who",
            "EXPLAIN SELECT 1",
            "VALUES (1)",
            "(SELECT 1)",
        ] {
            assert_eq!(rejected_kind(sql), ErrorKind::ForbiddenOperation, "{}", sql);
        }
    }

    #[test]
    fn test_forbidden_verb_reported() {
        let verdict = validate("delete from sales_data");
        let error = verdict.rejection().unwrap();
        assert!(error.detail.contains("DELETE"), "{}", error.detail);
    }

    #[test]
    fn test_comment_cannot_hide_verb() {
        assert_eq!(
            rejected_kind("/* SELECT */ DELETE FROM t"),
            ErrorKind::ForbiddenOperation
        );
        assert!(validate("-- DELETE FROM t\nSELECT 1").is_accepted());
    }

    #[test]
    fn test_comment_stripped_from_accepted_text() {
        assert_eq!(
            accepted_text("SELECT a /* note */ FROM t -- done"),
            "SELECT a   FROM t"
        );
    }

    #[test]
    fn test_denylist_anywhere() {
        assert_eq!(
            rejected_kind("SELECT * FROM t WHERE id IN (DELETE FROM u RETURNING id)"),
            ErrorKind::ForbiddenOperation
        );
    }

    #[test]
    fn test_keywords_in_literals_and_identifiers_are_fine() {
        assert!(validate("SELECT 'drop table t' AS msg").is_accepted());
        assert!(validate("SELECT \"update\" FROM audit").is_accepted());
        assert!(validate("SELECT last_update, deleted_at FROM t").is_accepted());
    }

    #[test]
    fn test_replace_function_allowed() {
        assert!(validate("SELECT replace(name, 'a', 'b') FROM t").is_accepted());
        assert!(validate("SELECT REPLACE (name, 'a', 'b') FROM t").is_accepted());
    }

    #[test]
    fn test_with_select_accepted() {
        let sql = "WITH totals AS (SELECT region, SUM(amount) AS s FROM sales GROUP BY region) SELECT * FROM totals";
        assert_eq!(accepted_text(sql), sql);
        assert!(validate(
            "WITH RECURSIVE c(x) AS (VALUES(1) UNION ALL SELECT x + 1 FROM c WHERE x < 5) SELECT x FROM c"
        )
        .is_accepted());
    }

    #[test]
    fn test_with_write_rejected() {
        let verdict = validate("WITH x AS (SELECT 1) DELETE FROM t");
        let error = verdict.rejection().unwrap();
        assert_eq!(error.kind, ErrorKind::ForbiddenOperation);
        assert!(error.detail.contains("DELETE"));
        assert_eq!(
            rejected_kind("WITH x AS (SELECT 1)"),
            ErrorKind::ForbiddenOperation
        );
    }

    #[test]
    fn test_system_catalogs_rejected() {
        for sql in [
            "SELECT * FROM sqlite_master",
            "SELECT sql FROM main.sqlite_schema",
            "SELECT * FROM \"sqlite_master\"",
            "SELECT * FROM [SQLITE_TEMP_MASTER]",
            "SELECT * FROM pragma_table_info('users')",
            "SELECT * FROM dbstat",
        ] {
            assert_eq!(rejected_kind(sql), ErrorKind::ForbiddenOperation, "{}", sql);
        }
    }

    #[test]
    fn test_catalog_name_in_schema_is_allowed() {
        let schema = SchemaSnapshot::new(vec![TableDescriptor {
            name: "dbstat".into(),
            columns: vec![],
            row_count: 0,
            sample_rows: vec![],
        }]);
        let verdict = SqlValidator::new().validate("SELECT * FROM dbstat", &schema);
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_dangerous_functions_rejected() {
        assert_eq!(
            rejected_kind("SELECT load_extension('/tmp/evil.so')"),
            ErrorKind::ForbiddenOperation
        );
        assert_eq!(
            rejected_kind("SELECT writefile('/tmp/x', 'y')"),
            ErrorKind::ForbiddenOperation
        );
        // A column that happens to share the name is not a call.
        assert!(validate("SELECT edit FROM revisions").is_accepted());
    }

    #[test]
    fn test_idempotent() {
        let schema = SchemaSnapshot::default();
        let validator = SqlValidator::new();
        for sql in ["SELECT 1", "DELETE FROM t", "SELECT 1; SELECT 2", ""] {
            assert_eq!(validator.validate(sql, &schema), validator.validate(sql, &schema));
        }
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(validate("SELECT 1")).unwrap();
        assert_eq!(json["verdict"], "accepted");
        assert_eq!(json["statement"], "SELECT 1");

        let json = serde_json::to_value(validate("DROP TABLE t")).unwrap();
        assert_eq!(json["verdict"], "rejected");
        assert_eq!(json["error"]["kind"], "forbidden_operation");
    }
}
