//! Per-query pipeline state
//!
//! One [`PipelineState`] exists per question. It is owned by the
//! orchestrator for the lifetime of the query and never shared.

use crate::error::{ErrorKind, PipelineError};
use crate::result::ExecutionResult;
use crate::schema::SchemaSnapshot;
use crate::sql::{RewrittenStatement, ValidationVerdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pipeline stage. Stages run in declaration order; `Done` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Introspecting,
    AwaitingGeneration,
    Validating,
    Rewriting,
    Executing,
    AwaitingInterpretation,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    /// The stage after a successful `self`, or `None` when terminal.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Introspecting => Some(Stage::AwaitingGeneration),
            Stage::AwaitingGeneration => Some(Stage::Validating),
            Stage::Validating => Some(Stage::Rewriting),
            Stage::Rewriting => Some(Stage::Executing),
            Stage::Executing => Some(Stage::AwaitingInterpretation),
            Stage::AwaitingInterpretation => Some(Stage::Done),
            Stage::Done | Stage::Failed(_) => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Introspecting => f.write_str("introspecting"),
            Stage::AwaitingGeneration => f.write_str("awaiting_generation"),
            Stage::Validating => f.write_str("validating"),
            Stage::Rewriting => f.write_str("rewriting"),
            Stage::Executing => f.write_str("executing"),
            Stage::AwaitingInterpretation => f.write_str("awaiting_interpretation"),
            Stage::Done => f.write_str("done"),
            Stage::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// Mutable record threaded through the stages of one query.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub id: Uuid,
    pub question: String,
    stage: Stage,
    pub schema: Option<SchemaSnapshot>,
    /// SQL extracted from the generator's reply.
    pub candidate: Option<String>,
    pub verdict: Option<ValidationVerdict>,
    pub rewritten: Option<RewrittenStatement>,
    pub result: Option<ExecutionResult>,
    pub interpretation: Option<String>,
    error: Option<PipelineError>,
    failed_at: Option<Stage>,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            stage: Stage::Introspecting,
            schema: None,
            candidate: None,
            verdict: None,
            rewritten: None,
            result: None,
            interpretation: None,
            error: None,
            failed_at: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn error(&self) -> Option<&PipelineError> {
        self.error.as_ref()
    }

    /// Stage that was running when the query failed.
    pub fn failed_at(&self) -> Option<Stage> {
        self.failed_at
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to the next stage. Terminal states do not move.
    pub fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
    }

    /// Enter `Failed`. Only the first error is kept.
    pub fn fail(&mut self, error: PipelineError) {
        if self.error.is_some() {
            return;
        }
        self.failed_at = Some(self.stage);
        self.stage = Stage::Failed(error.kind);
        self.error = Some(error);
    }

    /// Caller-facing view of the finished state.
    pub fn into_outcome(self) -> QueryOutcome {
        QueryOutcome {
            id: self.id,
            question: self.question,
            generated_sql: self.candidate,
            result: self.result,
            interpretation: self.interpretation,
            error: self.error,
            failed_at: self.failed_at,
        }
    }
}

/// Result of one query as returned to callers.
///
/// On `InterpretationFailed` the execution result is still present; on any
/// other failure everything after the failing stage is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub id: Uuid,
    pub question: String,
    pub generated_sql: Option<String>,
    pub result: Option<ExecutionResult>,
    pub interpretation: Option<String>,
    pub error: Option<PipelineError>,
    pub failed_at: Option<Stage>,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Statement text that was executed, if execution happened.
    pub fn executed_sql(&self) -> Option<&str> {
        self.result.as_ref().map(|r| r.statement.as_str())
    }
}
