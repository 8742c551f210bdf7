//! Linear query state machine
//!
//! `Introspecting → AwaitingGeneration → Validating → Rewriting → Executing →
//! AwaitingInterpretation → Done`. A stage either succeeds and the state
//! advances, or fails and the state enters `Failed`; nothing runs after that.

use super::history::HistoryEntry;
use super::state::{PipelineState, Stage};
use crate::backend::DatabaseBackend;
use crate::config::PipelineConfig;
use crate::error::{ErrorKind, PipelineError};
use crate::llm::{GenerationRequest, InterpretationRequest, ResultInterpreter, SqlGenerator};
use crate::sql::{extract_sql, SqlValidator, StatementRewriter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

/// Runs single queries through the stage sequence.
pub struct Orchestrator {
    config: PipelineConfig,
    backend: Arc<dyn DatabaseBackend>,
    generator: Arc<dyn SqlGenerator>,
    interpreter: Arc<dyn ResultInterpreter>,
    validator: SqlValidator,
    rewriter: StatementRewriter,
}

type StageResult = std::result::Result<(), PipelineError>;

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn DatabaseBackend>,
        generator: Arc<dyn SqlGenerator>,
        interpreter: Arc<dyn ResultInterpreter>,
    ) -> Self {
        let rewriter = StatementRewriter::new(config.row_limit_ceiling);
        Self {
            config,
            backend,
            generator,
            interpreter,
            validator: SqlValidator::new(),
            rewriter,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `question` to a terminal state.
    ///
    /// `history` is a read-only copy of earlier queries offered to the
    /// generator.
    pub async fn run(&self, question: &str, history: &[HistoryEntry]) -> PipelineState {
        let state = PipelineState::new(question);
        let span = info_span!(
            "query",
            query_id = %state.id,
            backend = self.backend.name(),
        );
        self.drive(state, history).instrument(span).await
    }

    async fn drive(&self, mut state: PipelineState, history: &[HistoryEntry]) -> PipelineState {
        info!(question = %state.question, "Query started");

        while !state.is_terminal() {
            let stage = state.stage();
            let outcome = match stage {
                Stage::Introspecting => self.introspect(&mut state).await,
                Stage::AwaitingGeneration => self.generate(&mut state, history).await,
                Stage::Validating => self.validate(&mut state),
                Stage::Rewriting => self.rewrite(&mut state),
                Stage::Executing => self.execute(&mut state).await,
                Stage::AwaitingInterpretation => self.interpret(&mut state).await,
                Stage::Done | Stage::Failed(_) => Ok(()),
            };

            match outcome {
                Ok(()) => {
                    debug!(%stage, "Stage complete");
                    state.advance();
                }
                Err(error) => {
                    warn!(%stage, kind = %error.kind, detail = %error.detail, "Query failed");
                    state.fail(error);
                }
            }
        }

        if state.stage() == Stage::Done {
            info!("Query finished");
        }
        state
    }

    async fn introspect(&self, state: &mut PipelineState) -> StageResult {
        let schema = self
            .backend
            .introspect(self.config.sample_rows, self.config.execution_timeout)
            .await
            .map_err(|e| e.classify(ErrorKind::SchemaUnavailable))?;
        state.schema = Some(schema);
        Ok(())
    }

    async fn generate(&self, state: &mut PipelineState, history: &[HistoryEntry]) -> StageResult {
        let schema = state
            .schema
            .as_ref()
            .ok_or_else(|| missing(ErrorKind::GenerationFailed, "schema"))?;
        let request = GenerationRequest {
            question: &state.question,
            schema,
            history,
        };

        let reply = with_deadline(
            self.config.generation_timeout,
            ErrorKind::GenerationFailed,
            "generation",
            self.generator.generate(&request),
        )
        .await?;

        let sql = extract_sql(&reply);
        if sql.trim().is_empty() {
            return Err(PipelineError::new(
                ErrorKind::GenerationFailed,
                "generator returned no SQL",
            ));
        }
        debug!(sql = %sql, "SQL generated");
        state.candidate = Some(sql);
        Ok(())
    }

    fn validate(&self, state: &mut PipelineState) -> StageResult {
        let candidate = state
            .candidate
            .as_deref()
            .ok_or_else(|| missing(ErrorKind::EmptyInput, "candidate statement"))?;
        let schema = state
            .schema
            .as_ref()
            .ok_or_else(|| missing(ErrorKind::SchemaUnavailable, "schema"))?;

        let verdict = self.validator.validate(candidate, schema);
        let rejection = verdict.rejection().cloned();
        state.verdict = Some(verdict);
        match rejection {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn rewrite(&self, state: &mut PipelineState) -> StageResult {
        let accepted = state
            .verdict
            .as_ref()
            .and_then(|v| v.accepted())
            .ok_or_else(|| missing(ErrorKind::ForbiddenOperation, "accepted statement"))?;
        state.rewritten = Some(self.rewriter.rewrite(accepted));
        Ok(())
    }

    async fn execute(&self, state: &mut PipelineState) -> StageResult {
        let statement = state
            .rewritten
            .as_ref()
            .ok_or_else(|| missing(ErrorKind::ExecutionFailed, "rewritten statement"))?;
        let result = self
            .backend
            .execute(statement, self.config.execution_timeout)
            .await
            .map_err(|e| e.kind_or(ErrorKind::ExecutionFailed))?;
        state.result = Some(result);
        Ok(())
    }

    async fn interpret(&self, state: &mut PipelineState) -> StageResult {
        let result = state
            .result
            .as_ref()
            .ok_or_else(|| missing(ErrorKind::InterpretationFailed, "execution result"))?;
        let request = InterpretationRequest {
            question: &state.question,
            result,
        };

        let text = with_deadline(
            self.config.interpretation_timeout,
            ErrorKind::InterpretationFailed,
            "interpretation",
            self.interpreter.interpret(&request),
        )
        .await?;

        if text.trim().is_empty() {
            return Err(PipelineError::new(
                ErrorKind::InterpretationFailed,
                "interpreter returned no text",
            ));
        }
        state.interpretation = Some(text);
        Ok(())
    }
}

/// Await a collaborator call, treating a timeout like any other failure.
async fn with_deadline<F>(
    timeout: Duration,
    kind: ErrorKind,
    what: &str,
    call: F,
) -> std::result::Result<String, PipelineError>
where
    F: std::future::Future<Output = crate::error::Result<String>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(e.classify(kind)),
        Err(_) => Err(PipelineError::new(
            kind,
            format!("{} timed out after {} ms", what, timeout.as_millis()),
        )),
    }
}

fn missing(kind: ErrorKind, what: &str) -> PipelineError {
    PipelineError::new(kind, format!("{} missing from pipeline state", what))
}
