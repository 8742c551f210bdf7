//! Configuration file support for sqlguard
//!
//! This module provides TOML configuration file parsing and merging onto the
//! built-in defaults.
//!
//! ## Priority Order
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! ## Example Configuration
//!
//! ```toml
//! # sqlguard.toml
//!
//! [pipeline]
//! row_limit_ceiling = 1000
//! execution_timeout_ms = 30000
//! history_window = 3
//!
//! [llm]
//! api_base = "https://dashscope.aliyuncs.com/compatible-mode/v1"
//! model = "qwen3-coder-plus"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{LlmConfig, PipelineConfig, DEFAULT_CONFIG_FILE};
use crate::error::{Result, SqlGuardError};

/// Root configuration structure for TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Pipeline limits and timeouts
    pub pipeline: PipelineSection,

    /// Text-generation service
    pub llm: LlmSection,
}

/// Pipeline section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Maximum rows returned per query
    pub row_limit_ceiling: Option<usize>,

    /// Execution timeout in milliseconds
    pub execution_timeout_ms: Option<u64>,

    /// SQL generation timeout in milliseconds
    pub generation_timeout_ms: Option<u64>,

    /// Interpretation timeout in milliseconds
    pub interpretation_timeout_ms: Option<u64>,

    /// Earlier questions offered to the generator
    pub history_window: Option<usize>,

    /// Sample rows captured per table
    pub sample_rows: Option<usize>,

    /// Batch queries run at the same time
    pub batch_concurrency: Option<usize>,

    /// Largest string or blob a statement may build, in bytes
    pub max_value_bytes: Option<usize>,

    /// Accepted only as `true`; present so that an attempt to disable
    /// read-only execution fails loudly instead of being ignored.
    pub read_only: Option<bool>,
}

/// LLM section configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// OpenAI-compatible API base URL
    pub api_base: Option<String>,

    /// API key (prefer the SQLGUARD_API_KEY environment variable)
    pub api_key: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SqlGuardError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents).map_err(|e| match e {
            SqlGuardError::Config(msg) => {
                SqlGuardError::Config(format!("Invalid config file {:?}: {}", path, msg))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: ConfigFile =
            toml::from_str(contents).map_err(|e| SqlGuardError::Config(e.to_string()))?;

        if config.pipeline.read_only == Some(false) {
            return Err(SqlGuardError::Config(
                "read_only cannot be disabled; connections are always opened read-only".into(),
            ));
        }

        Ok(config)
    }

    /// Load `./sqlguard.toml` if it exists
    ///
    /// A missing file is `Ok(None)`; a file that exists but cannot be read or
    /// parsed is an error.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load `sqlguard.toml` from `dir` if it exists
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("No config file at {:?}", path);
            return Ok(None);
        }

        let config = Self::load(&path)?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(Some(config))
    }

    /// Apply the file's pipeline section over `base`
    pub fn pipeline_config(&self, base: PipelineConfig) -> PipelineConfig {
        let section = &self.pipeline;
        PipelineConfig {
            row_limit_ceiling: section.row_limit_ceiling.unwrap_or(base.row_limit_ceiling),
            execution_timeout: section
                .execution_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(base.execution_timeout),
            generation_timeout: section
                .generation_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(base.generation_timeout),
            interpretation_timeout: section
                .interpretation_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(base.interpretation_timeout),
            history_window: section.history_window.unwrap_or(base.history_window),
            sample_rows: section.sample_rows.unwrap_or(base.sample_rows),
            batch_concurrency: section.batch_concurrency.unwrap_or(base.batch_concurrency),
            max_value_bytes: section.max_value_bytes.unwrap_or(base.max_value_bytes),
        }
    }

    /// Apply the file's llm section over `base`
    pub fn llm_config(&self, base: LlmConfig) -> LlmConfig {
        let section = &self.llm;
        LlmConfig {
            api_base: section.api_base.clone().unwrap_or(base.api_base),
            api_key: section.api_key.clone().or(base.api_key),
            model: section.model.clone().unwrap_or(base.model),
            temperature: section.temperature.unwrap_or(base.temperature),
            request_timeout: section
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(base.request_timeout),
        }
    }

    /// Generate an example configuration file
    pub fn generate_example() -> String {
        r#"# sqlguard configuration file
# Copy to sqlguard.toml and customize as needed

[pipeline]
# Maximum rows ever returned by a query. A user LIMIT above this is lowered.
row_limit_ceiling = 1000

# Statements running longer than this are interrupted.
execution_timeout_ms = 30000

# Timeouts for the external generation and interpretation calls.
generation_timeout_ms = 60000
interpretation_timeout_ms = 60000

# Earlier (question, SQL) pairs offered to the generator in a sequential batch.
history_window = 3

# Sample rows captured per table for grounding.
sample_rows = 3

# Batch queries run at the same time (1 = sequential, keeps history).
batch_concurrency = 1

# Largest string or blob a statement may build, in bytes.
max_value_bytes = 16777216

[llm]
api_base = "https://dashscope.aliyuncs.com/compatible-mode/v1"
model = "qwen3-coder-plus"
temperature = 0.0
request_timeout_ms = 60000
# api_key is best supplied through SQLGUARD_API_KEY
"#
        .to_string()
    }
}
