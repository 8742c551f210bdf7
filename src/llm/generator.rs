//! Natural language to SQL generation

use super::provider::LlmProvider;
use crate::error::Result;
use crate::pipeline::HistoryEntry;
use crate::schema::SchemaSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

/// System prompt for SQL generation.
pub const SQL_SYSTEM_PROMPT: &str =
    "You are an SQL expert who turns natural-language questions into precise SQL queries.";

/// History SQL longer than this is cut in the prompt.
const HISTORY_SQL_CHARS: usize = 100;

/// Everything the generator is given for one question.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub question: &'a str,
    pub schema: &'a SchemaSnapshot,
    /// Earlier successful queries, oldest first.
    pub history: &'a [HistoryEntry],
}

/// Produces candidate SQL text for a question.
///
/// The returned text is untrusted; it may contain prose or fences and is
/// always extracted and validated before anything runs.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;
}

/// Generator backed by a chat-completion provider.
pub struct LlmSqlGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl LlmSqlGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let prompt = build_generation_prompt(request);
        self.provider.complete(SQL_SYSTEM_PROMPT, &prompt).await
    }
}

/// Generator that always returns the same text.
///
/// Lets literal SQL go through the same validation and execution path as
/// generated SQL.
#[derive(Debug, Clone)]
pub struct FixedSqlGenerator {
    sql: String,
}

impl FixedSqlGenerator {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

#[async_trait]
impl SqlGenerator for FixedSqlGenerator {
    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String> {
        Ok(self.sql.clone())
    }
}

/// Build the user prompt: schema, recent history, question and rules.
pub fn build_generation_prompt(request: &GenerationRequest<'_>) -> String {
    let mut history = String::new();
    if !request.history.is_empty() {
        history.push_str("\n\nEarlier queries:\n");
        for (i, entry) in request.history.iter().enumerate() {
            history.push_str(&format!("{}. Question: {}\n", i + 1, entry.question));
            history.push_str(&format!("   SQL: {}\n", shorten(&entry.sql, HISTORY_SQL_CHARS)));
        }
    }

    format!(
        "Write a SQLite SQL query that answers the user's question.\n\
         \n\
         Database schema:\n\
         {schema}{history}\n\
         \n\
         Question: {question}\n\
         \n\
         Rules:\n\
         1. Output only the SQL statement, with no explanation.\n\
         2. Use standard SQLite syntax.\n\
         3. Generate a single SELECT query only (no INSERT, UPDATE, DELETE or other changes).\n\
         4. Use GROUP BY for aggregation or grouping.\n\
         5. Use ORDER BY for sorting.\n\
         6. Add a LIMIT; unless the question asks otherwise, default to 100 rows.\n\
         7. Make sure table and column names match the schema.\n\
         8. Use SQLite date functions for time ranges.\n\
         \n\
         SQL:",
        schema = request.schema.render_for_prompt(),
        history = history.trim_end(),
        question = request.question,
    )
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
