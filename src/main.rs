//! sqlguard - ask questions of a SQLite database without trusting the SQL
//!
//! Command-line front end for the sqlguard pipeline.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use sqlguard::{ConfigFile, ErrorHint, LlmConfig, PipelineConfig, Result, SqlGuardError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_commands;
mod cli_format;

use crate::cli_format::OutputFormat;

/// sqlguard CLI
#[derive(Parser, Debug)]
#[command(name = "sqlguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate, bound and run LLM-generated SQL against SQLite, read-only")]
#[command(long_about = r#"Validate, bound and run LLM-generated SQL against SQLite, read-only

Questions are turned into SQL by an OpenAI-compatible model. The SQL is then
validated (single SELECT only), capped with a LIMIT and executed on a
read-only connection with a timeout.

QUICK START:
    # Ask a question
    sqlguard query sales.db "Total sales per region?"

    # Several questions, one per line
    sqlguard batch sales.db --file questions.txt

    # Check SQL without running it
    sqlguard validate "SELECT * FROM sales_data; DROP TABLE sales_data"

    # Run literal SQL through the same safety checks
    sqlguard exec sales.db "SELECT region, COUNT(*) FROM sales_data GROUP BY region"

ENVIRONMENT VARIABLES:
    SQLGUARD_API_KEY        API key for the model endpoint
    SQLGUARD_API_BASE       OpenAI-compatible API base URL
    SQLGUARD_MODEL          Model identifier
    SQLGUARD_CONFIG         Configuration file (default: ./sqlguard.toml)
    RUST_LOG                Log filter (overrides --verbose)
    NO_COLOR                Disable colored output"#)]
struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', global = true, env = "SQLGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log stage transitions and engine details to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Maximum rows returned by any query
    #[arg(long, global = true, env = "SQLGUARD_ROW_LIMIT")]
    row_limit: Option<usize>,

    /// Execution timeout in milliseconds
    #[arg(long, global = true, env = "SQLGUARD_EXECUTION_TIMEOUT_MS")]
    execution_timeout_ms: Option<u64>,

    /// SQL generation timeout in milliseconds
    #[arg(long, global = true)]
    generation_timeout_ms: Option<u64>,

    /// Interpretation timeout in milliseconds
    #[arg(long, global = true)]
    interpretation_timeout_ms: Option<u64>,

    /// OpenAI-compatible API base URL
    #[arg(long, global = true, env = "SQLGUARD_API_BASE")]
    api_base: Option<String>,

    /// API key for the model endpoint
    #[arg(long, global = true, env = "SQLGUARD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier
    #[arg(long, global = true, env = "SQLGUARD_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question
    Query {
        /// SQLite database file
        db: PathBuf,

        /// Natural-language question
        question: String,
    },

    /// Answer several questions; each fails independently
    #[command(long_about = r#"Answer several questions; each fails independently

EXAMPLES:
    # Questions as arguments
    sqlguard batch sales.db "Top 5 products?" "Sales per month?"

    # One question per line from a file (blank lines and # comments skipped)
    sqlguard batch sales.db --file questions.txt

    # Run four at a time (no history between questions)
    sqlguard batch sales.db --file questions.txt --concurrency 4"#)]
    Batch {
        /// SQLite database file
        db: PathBuf,

        /// Questions
        questions: Vec<String>,

        /// Read questions from a file, one per line
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,

        /// Questions run at the same time (1 = sequential with history)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show the tables, columns and row counts of a database
    Schema {
        /// SQLite database file
        db: PathBuf,

        /// Sample rows to show per table
        #[arg(long, default_value = "0")]
        samples: usize,
    },

    /// Validate and rewrite SQL without executing it
    Validate {
        /// Candidate SQL
        sql: String,

        /// Database whose schema allows otherwise-denied catalog names
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Run literal SQL through validation, rewriting and read-only execution
    Exec {
        /// SQLite database file
        db: PathBuf,

        /// SQL statement
        sql: String,
    },

    /// Show the effective configuration
    Config {
        /// Print an example configuration file instead
        #[arg(long)]
        example: bool,
    },
}

/// Settings shared by every command.
pub(crate) struct Settings {
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub format: OutputFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            cli_format::print_error(&e.with_hint());
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Config { example: true } = cli.command {
        println!("{}", ConfigFile::generate_example());
        return Ok(ExitCode::SUCCESS);
    }

    let settings = resolve_settings(&cli)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| SqlGuardError::Internal(format!("Failed to create Tokio runtime: {}", e)))?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Query { db, question } => {
                cli_commands::handle_query(&settings, &db, &question).await
            }
            Commands::Batch {
                db,
                questions,
                file,
                concurrency,
            } => {
                cli_commands::handle_batch(&settings, &db, questions, file.as_deref(), concurrency)
                    .await
            }
            Commands::Schema { db, samples } => {
                cli_commands::handle_schema(&settings, &db, samples).await
            }
            Commands::Validate { sql, db } => {
                cli_commands::handle_validate(&settings, &sql, db.as_deref()).await
            }
            Commands::Exec { db, sql } => cli_commands::handle_exec(&settings, &db, &sql).await,
            Commands::Config { .. } => cli_commands::handle_config(&settings),
        }
    })
}

/// Defaults, then the config file, then flags and environment.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.config {
        Some(path) => Some(ConfigFile::load(path)?),
        None => ConfigFile::load_default()?,
    };

    let mut pipeline = PipelineConfig::default();
    let mut llm = LlmConfig::default();
    if let Some(ref file) = file {
        pipeline = file.pipeline_config(pipeline);
        llm = file.llm_config(llm);
    }

    if let Some(n) = cli.row_limit {
        pipeline.row_limit_ceiling = n;
    }
    if let Some(ms) = cli.execution_timeout_ms {
        pipeline.execution_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.generation_timeout_ms {
        pipeline.generation_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.interpretation_timeout_ms {
        pipeline.interpretation_timeout = Duration::from_millis(ms);
    }
    if let Some(ref base) = cli.api_base {
        llm.api_base = base.clone();
    }
    if let Some(ref key) = cli.api_key {
        llm.api_key = Some(key.clone());
    }
    if let Some(ref model) = cli.model {
        llm.model = model.clone();
    }

    pipeline.validate()?;

    Ok(Settings {
        pipeline,
        llm,
        format: cli.format,
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info,sqlguard=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
