use crate::cli_format::{print_json, print_outcomes, print_schema, print_verdict, OutputFormat};
use crate::Settings;
use sqlguard::{
    DatabaseBackend, FixedSqlGenerator, Pipeline, QueryOutcome, Result, SchemaSnapshot,
    SqlGuardError, SqlValidator, SqliteBackend, StatementRewriter, SummaryInterpreter,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Rows shown by the deterministic interpreter used for literal SQL.
const SUMMARY_ROWS: usize = 20;

fn exit_for(outcomes: &[QueryOutcome]) -> ExitCode {
    if outcomes.iter().all(QueryOutcome::is_success) {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

pub(crate) async fn handle_query(settings: &Settings, db: &Path, question: &str) -> Result<ExitCode> {
    let pipeline = Pipeline::with_llm(settings.pipeline.clone(), settings.llm.clone())?;
    let outcome = pipeline.run_query(db, question).await;
    let outcomes = [outcome];
    match settings.format {
        OutputFormat::Json => print_json(&outcomes[0])?,
        OutputFormat::Text => crate::cli_format::print_outcome_text(&outcomes[0]),
    }
    Ok(exit_for(&outcomes))
}

/// Questions from arguments and/or a file; blank lines and `#` comments skipped.
fn collect_questions(mut questions: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)?;
        questions.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }
    if questions.is_empty() {
        return Err(SqlGuardError::Config(
            "no questions given; pass them as arguments or with --file".into(),
        ));
    }
    Ok(questions)
}

pub(crate) async fn handle_batch(
    settings: &Settings,
    db: &Path,
    questions: Vec<String>,
    file: Option<&Path>,
    concurrency: Option<usize>,
) -> Result<ExitCode> {
    let questions = collect_questions(questions, file)?;
    let mut config = settings.pipeline.clone();
    if let Some(n) = concurrency {
        config = config.with_batch_concurrency(n);
    }

    let pipeline = Pipeline::with_llm(config, settings.llm.clone())?;
    let outcomes = pipeline.run_queries(db, &questions).await;
    print_outcomes(&outcomes, settings.format)?;
    Ok(exit_for(&outcomes))
}

pub(crate) async fn handle_schema(settings: &Settings, db: &Path, samples: usize) -> Result<ExitCode> {
    let backend = SqliteBackend::new(db).with_max_value_bytes(settings.pipeline.max_value_bytes);
    let schema = backend
        .introspect(samples, settings.pipeline.execution_timeout)
        .await?;
    print_schema(&schema, settings.format)?;
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn handle_validate(
    settings: &Settings,
    sql: &str,
    db: Option<&Path>,
) -> Result<ExitCode> {
    let schema = match db {
        Some(db) => {
            SqliteBackend::new(db)
                .with_max_value_bytes(settings.pipeline.max_value_bytes)
                .introspect(0, settings.pipeline.execution_timeout)
                .await?
        }
        None => SchemaSnapshot::default(),
    };

    let verdict = SqlValidator::new().validate(sql, &schema);
    let rewritten = verdict
        .accepted()
        .map(|accepted| StatementRewriter::new(settings.pipeline.row_limit_ceiling).rewrite(accepted));
    print_verdict(&verdict, rewritten.as_ref(), settings.format)?;

    Ok(if verdict.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

pub(crate) async fn handle_exec(settings: &Settings, db: &Path, sql: &str) -> Result<ExitCode> {
    let pipeline = Pipeline::new(
        settings.pipeline.clone(),
        Arc::new(FixedSqlGenerator::new(sql)),
        Arc::new(SummaryInterpreter::new(SUMMARY_ROWS)),
    )?;
    let outcome = pipeline.run_query(db, sql).await;
    let outcomes = [outcome];
    match settings.format {
        OutputFormat::Json => print_json(&outcomes[0])?,
        OutputFormat::Text => {
            let outcome = &outcomes[0];
            match (&outcome.result, &outcome.error) {
                (Some(result), None) => crate::cli_format::print_result(result),
                _ => crate::cli_format::print_outcome_text(outcome),
            }
        }
    }
    Ok(exit_for(&outcomes))
}

pub(crate) fn handle_config(settings: &Settings) -> Result<ExitCode> {
    #[derive(serde::Serialize)]
    struct Effective<'a> {
        pipeline: &'a sqlguard::PipelineConfig,
        read_only: bool,
        llm: &'a sqlguard::LlmConfig,
        api_key_set: bool,
    }

    let effective = Effective {
        pipeline: &settings.pipeline,
        read_only: settings.pipeline.read_only(),
        llm: &settings.llm,
        api_key_set: settings.llm.api_key.is_some(),
    };

    match settings.format {
        OutputFormat::Json => print_json(&effective)?,
        OutputFormat::Text => {
            let p = &settings.pipeline;
            println!("row_limit_ceiling        {}", p.row_limit_ceiling);
            println!("execution_timeout        {:?}", p.execution_timeout);
            println!("generation_timeout       {:?}", p.generation_timeout);
            println!("interpretation_timeout   {:?}", p.interpretation_timeout);
            println!("history_window           {}", p.history_window);
            println!("sample_rows              {}", p.sample_rows);
            println!("batch_concurrency        {}", p.batch_concurrency);
            println!("max_value_bytes          {}", p.max_value_bytes);
            println!("read_only                {}", effective.read_only);
            println!("llm.api_base             {}", settings.llm.api_base);
            println!("llm.model                {}", settings.llm.model);
            println!("llm.api_key              {}", if effective.api_key_set { "set" } else { "not set" });
        }
    }
    Ok(ExitCode::SUCCESS)
}
