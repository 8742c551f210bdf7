//! Row-cap rewriting
//!
//! Every accepted statement leaves here with an outermost `LIMIT` no larger
//! than the configured ceiling. The outermost clause is the first `LIMIT`
//! keyword at parenthesis depth zero; limits inside subqueries and CTE bodies
//! are left alone.
//!
//! Alongside the effective text the rewriter renders a lookahead form that
//! asks for one extra row. The engine runs the lookahead and keeps at most
//! `row_cap` rows, which is how it knows whether the cap truncated anything.

use super::lexer::{self, TokenKind};
use super::validator::AcceptedStatement;
use serde::Serialize;
use tracing::debug;

/// Statement text ready for the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrittenStatement {
    /// Effective statement, with the cap applied.
    pub sql: String,
    /// Statement sent to the engine; asks for one row beyond `row_cap` when
    /// the ceiling was imposed.
    #[serde(skip)]
    pub(crate) lookahead_sql: String,
    /// Maximum rows to materialize.
    pub row_cap: usize,
    /// True when the rewriter added or lowered the outermost limit.
    pub ceiling_applied: bool,
}

impl RewrittenStatement {
    /// Text the engine actually submits.
    pub fn lookahead_sql(&self) -> &str {
        &self.lookahead_sql
    }
}

/// Parsed tail of an outermost `LIMIT` clause.
struct LimitClause<'a> {
    count: &'a str,
    offset: Option<&'a str>,
    /// Written as SQLite's `offset, count`.
    comma_form: bool,
}

/// Applies the row ceiling to accepted statements.
#[derive(Debug, Clone)]
pub struct StatementRewriter {
    ceiling: usize,
}

impl StatementRewriter {
    /// Create a rewriter. A zero ceiling is raised to one.
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Bound `statement` by the ceiling.
    pub fn rewrite(&self, statement: &AcceptedStatement) -> RewrittenStatement {
        let rewritten = self.rewrite_text(statement.as_str());
        debug!(
            sql = %rewritten.sql,
            row_cap = rewritten.row_cap,
            ceiling_applied = rewritten.ceiling_applied,
            "Statement rewritten"
        );
        rewritten
    }

    fn rewrite_text(&self, text: &str) -> RewrittenStatement {
        let text = text.trim();
        let text = text.strip_suffix(';').map(str::trim_end).unwrap_or(text);
        let ceiling = self.ceiling;
        let lookahead = ceiling.saturating_add(1);

        let tokens = lexer::tokenize(text);
        let depths = lexer::depths(&tokens);
        let limit_at = tokens
            .iter()
            .zip(&depths)
            .find(|(t, depth)| **depth == 0 && t.is_keyword("LIMIT"))
            .map(|(t, _)| (t.start, t.end()));

        let Some((limit_start, limit_end)) = limit_at else {
            return self.imposed(text, &ceiling.to_string(), &lookahead.to_string(), None);
        };

        let body = text[..limit_start].trim_end();
        let clause = parse_limit_clause(&text[limit_end..]);

        if clause.count.is_empty() {
            // Dangling LIMIT: leave it for the engine to reject.
            return RewrittenStatement {
                sql: text.to_string(),
                lookahead_sql: text.to_string(),
                row_cap: ceiling,
                ceiling_applied: false,
            };
        }

        match parse_integer(clause.count) {
            Some(n) if n >= 0 && (n as u128) <= ceiling as u128 => {
                let sql = if clause.comma_form {
                    render(body, clause.count, clause.offset)
                } else {
                    text.to_string()
                };
                RewrittenStatement {
                    lookahead_sql: sql.clone(),
                    sql,
                    row_cap: ceiling,
                    ceiling_applied: false,
                }
            }
            // Negative means "no limit" in SQLite; larger than the ceiling is lowered.
            Some(_) => self.imposed(body, &ceiling.to_string(), &lookahead.to_string(), clause.offset),
            None => {
                let bounded = |cap: usize| {
                    format!(
                        "CASE WHEN ({expr}) BETWEEN 0 AND {ceiling} THEN ({expr}) ELSE {cap} END",
                        expr = clause.count,
                    )
                };
                self.imposed(body, &bounded(ceiling), &bounded(lookahead), clause.offset)
            }
        }
    }

    fn imposed(
        &self,
        body: &str,
        count: &str,
        lookahead_count: &str,
        offset: Option<&str>,
    ) -> RewrittenStatement {
        RewrittenStatement {
            sql: render(body, count, offset),
            lookahead_sql: render(body, lookahead_count, offset),
            row_cap: self.ceiling,
            ceiling_applied: true,
        }
    }
}

fn render(body: &str, count: &str, offset: Option<&str>) -> String {
    match offset {
        Some(offset) => format!("{} LIMIT {} OFFSET {}", body, count, offset),
        None => format!("{} LIMIT {}", body, count),
    }
}

/// Split the text after `LIMIT` into count and offset.
///
/// Handles `n`, `n OFFSET m` and SQLite's `m, n` form.
fn parse_limit_clause(rest: &str) -> LimitClause<'_> {
    let tokens = lexer::tokenize(rest);
    let depths = lexer::depths(&tokens);

    for (token, depth) in tokens.iter().zip(&depths) {
        if *depth != 0 {
            continue;
        }
        if token.is_keyword("OFFSET") {
            return LimitClause {
                count: rest[..token.start].trim(),
                offset: Some(rest[token.end()..].trim()),
                comma_form: false,
            };
        }
        if token.kind == TokenKind::Comma {
            return LimitClause {
                count: rest[token.end()..].trim(),
                offset: Some(rest[..token.start].trim()),
                comma_form: true,
            };
        }
    }

    LimitClause {
        count: rest.trim(),
        offset: None,
        comma_form: false,
    }
}

/// Integer literal value, allowing a sign and surrounding parentheses.
fn parse_integer(text: &str) -> Option<i128> {
    let mut text = text.trim();
    while let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        text = inner.trim();
    }
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.parse::<i128>().ok()
}
