//! Result interpretation

use super::provider::LlmProvider;
use crate::error::Result;
use crate::result::ExecutionResult;
use async_trait::async_trait;
use std::sync::Arc;

/// System prompt for result interpretation.
pub const INTERPRETATION_SYSTEM_PROMPT: &str =
    "You are a data analyst who explains query results in plain language.";

/// Rows shown to the interpreter.
const PROMPT_ROWS: usize = 10;

/// The question and the data that answered it.
#[derive(Debug, Clone, Copy)]
pub struct InterpretationRequest<'a> {
    pub question: &'a str,
    pub result: &'a ExecutionResult,
}

/// Explains an execution result in prose.
#[async_trait]
pub trait ResultInterpreter: Send + Sync {
    async fn interpret(&self, request: &InterpretationRequest<'_>) -> Result<String>;
}

/// Interpreter backed by a chat-completion provider.
pub struct LlmInterpreter {
    provider: Arc<dyn LlmProvider>,
}

impl LlmInterpreter {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ResultInterpreter for LlmInterpreter {
    async fn interpret(&self, request: &InterpretationRequest<'_>) -> Result<String> {
        let prompt = build_interpretation_prompt(request)?;
        self.provider
            .complete(INTERPRETATION_SYSTEM_PROMPT, &prompt)
            .await
    }
}

/// Deterministic interpreter rendering [`ExecutionResult::summary`].
#[derive(Debug, Clone)]
pub struct SummaryInterpreter {
    max_rows: usize,
}

impl SummaryInterpreter {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }
}

impl Default for SummaryInterpreter {
    fn default() -> Self {
        Self::new(20)
    }
}

#[async_trait]
impl ResultInterpreter for SummaryInterpreter {
    async fn interpret(&self, request: &InterpretationRequest<'_>) -> Result<String> {
        Ok(request.result.summary(self.max_rows))
    }
}

/// Build the user prompt: question, executed SQL, shape and leading rows.
pub fn build_interpretation_prompt(request: &InterpretationRequest<'_>) -> Result<String> {
    let result = request.result;
    let rows = serde_json::to_string_pretty(&result.records_limited(PROMPT_ROWS))?;
    let truncated = if result.truncated {
        "\n- The result was capped; more rows matched than are shown."
    } else {
        ""
    };

    Ok(format!(
        "Explain the query result below in plain language for the user's question.\n\
         \n\
         Question: {question}\n\
         \n\
         Executed SQL:\n\
         {sql}\n\
         \n\
         Result:\n\
         - Rows returned: {row_count}\n\
         - Columns: {columns}{truncated}\n\
         - First {limit} rows:\n\
         {rows}\n\
         \n\
         Provide:\n\
         1. A one or two sentence overview of the result.\n\
         2. Two to five key insights.\n\
         3. Any clear trend or anomaly.\n\
         \n\
         Keep it short and focused on the question.",
        question = request.question,
        sql = result.statement,
        row_count = result.row_count,
        columns = result.columns.join(", "),
        truncated = truncated,
        limit = PROMPT_ROWS,
        rows = rows,
    ))
}
