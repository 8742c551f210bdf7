//! Query pipeline
//!
//! [`Pipeline`] is the public entry point: it wires a database backend and
//! the two text collaborators into an [`Orchestrator`] and runs single
//! questions or batches. Each question gets its own [`PipelineState`] and its
//! own database connections; a failing question never affects another.

pub mod history;
pub mod orchestrator;
pub mod state;

pub use history::{HistoryEntry, QueryHistory};
pub use orchestrator::Orchestrator;
pub use state::{PipelineState, QueryOutcome, Stage};

use crate::backend::DatabaseBackend;
use crate::config::{LlmConfig, PipelineConfig};
use crate::error::Result;
use crate::llm::{
    LlmInterpreter, LlmProvider, LlmSqlGenerator, OpenAiCompatibleProvider, ResultInterpreter,
    SqlGenerator,
};
use crate::sqlite::SqliteBackend;
use futures_util::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Configured pipeline, reusable across databases and questions.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    generator: Arc<dyn SqlGenerator>,
    interpreter: Arc<dyn ResultInterpreter>,
}

impl Pipeline {
    /// Create a pipeline with explicit collaborators.
    pub fn new(
        config: PipelineConfig,
        generator: Arc<dyn SqlGenerator>,
        interpreter: Arc<dyn ResultInterpreter>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            generator,
            interpreter,
        })
    }

    /// Create a pipeline whose generator and interpreter share one
    /// OpenAI-compatible provider.
    pub fn with_llm(config: PipelineConfig, llm: LlmConfig) -> Result<Self> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::new(llm)?);
        Self::new(
            config,
            Arc::new(LlmSqlGenerator::new(provider.clone())),
            Arc::new(LlmInterpreter::new(provider)),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Orchestrator over an arbitrary backend.
    pub fn orchestrator(&self, backend: Arc<dyn DatabaseBackend>) -> Orchestrator {
        Orchestrator::new(
            self.config.clone(),
            backend,
            self.generator.clone(),
            self.interpreter.clone(),
        )
    }

    /// Answer one question against the SQLite database at `db_path`.
    pub async fn run_query(&self, db_path: impl AsRef<Path>, question: &str) -> QueryOutcome {
        let backend = Arc::new(
            SqliteBackend::new(db_path.as_ref()).with_max_value_bytes(self.config.max_value_bytes),
        );
        self.run_query_on(backend, question).await
    }

    pub async fn run_query_on(
        &self,
        backend: Arc<dyn DatabaseBackend>,
        question: &str,
    ) -> QueryOutcome {
        self.orchestrator(backend)
            .run(question, &[])
            .await
            .into_outcome()
    }

    /// Answer several questions, one outcome per question in input order.
    pub async fn run_queries<S: AsRef<str>>(
        &self,
        db_path: impl AsRef<Path>,
        questions: &[S],
    ) -> Vec<QueryOutcome> {
        let backend = Arc::new(
            SqliteBackend::new(db_path.as_ref()).with_max_value_bytes(self.config.max_value_bytes),
        );
        self.run_queries_on(backend, questions).await
    }

    /// Batch over an arbitrary backend.
    ///
    /// With `batch_concurrency == 1` questions run one after another and each
    /// sees the history of earlier successful ones. Otherwise up to
    /// `batch_concurrency` run at once without history.
    pub async fn run_queries_on<S: AsRef<str>>(
        &self,
        backend: Arc<dyn DatabaseBackend>,
        questions: &[S],
    ) -> Vec<QueryOutcome> {
        let orchestrator = self.orchestrator(backend);
        let concurrency = self.config.batch_concurrency.max(1);
        info!(queries = questions.len(), concurrency, "Batch started");

        let outcomes = if concurrency == 1 {
            let mut history = QueryHistory::new(self.config.history_window);
            let mut outcomes = Vec::with_capacity(questions.len());
            for question in questions {
                let outcome = orchestrator
                    .run(question.as_ref(), &history.snapshot())
                    .await
                    .into_outcome();
                if let (Some(sql), Some(_)) = (&outcome.generated_sql, &outcome.result) {
                    history.record(outcome.question.clone(), sql.clone());
                }
                outcomes.push(outcome);
            }
            outcomes
        } else {
            let orchestrator = &orchestrator;
            stream::iter(questions)
                .map(|question| async move {
                    orchestrator.run(question.as_ref(), &[]).await.into_outcome()
                })
                .buffered(concurrency)
                .collect::<Vec<_>>()
                .await
        };

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(queries = outcomes.len(), failed, "Batch finished");
        outcomes
    }
}
