//! Configuration module for sqlguard
//!
//! This module is organized into submodules:
//! - `defaults` - Default constants and values
//! - `file` - TOML configuration file support
//!
//! [`PipelineConfig`] is passed explicitly into the orchestrator; nothing in
//! the crate reads process-wide configuration state.

mod defaults;
pub mod file;

pub use defaults::*;
pub use file::ConfigFile;

use crate::error::{Result, SqlGuardError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one pipeline instance.
///
/// Read-only execution is not configurable: [`PipelineConfig::read_only`]
/// always returns `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum rows ever returned by a single query.
    pub row_limit_ceiling: usize,
    /// Execution timeout; the running statement is interrupted when exceeded.
    pub execution_timeout: Duration,
    /// Timeout applied to the external SQL generation call.
    pub generation_timeout: Duration,
    /// Timeout applied to the external interpretation call.
    pub interpretation_timeout: Duration,
    /// Number of earlier (question, SQL) pairs shown to the generator in a
    /// sequential batch. 0 disables history.
    pub history_window: usize,
    /// Sample rows captured per table during introspection.
    pub sample_rows: usize,
    /// Batch queries run at the same time. 1 runs the batch sequentially.
    pub batch_concurrency: usize,
    /// Largest string or blob a statement may build, in bytes.
    pub max_value_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            row_limit_ceiling: DEFAULT_ROW_LIMIT_CEILING,
            execution_timeout: Duration::from_millis(DEFAULT_EXECUTION_TIMEOUT_MS),
            generation_timeout: Duration::from_millis(DEFAULT_GENERATION_TIMEOUT_MS),
            interpretation_timeout: Duration::from_millis(DEFAULT_INTERPRETATION_TIMEOUT_MS),
            history_window: DEFAULT_HISTORY_WINDOW,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

impl PipelineConfig {
    /// Set the row ceiling.
    pub fn with_row_limit_ceiling(mut self, ceiling: usize) -> Self {
        self.row_limit_ceiling = ceiling;
        self
    }

    /// Set the execution timeout.
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Set the generation timeout.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Set the interpretation timeout.
    pub fn with_interpretation_timeout(mut self, timeout: Duration) -> Self {
        self.interpretation_timeout = timeout;
        self
    }

    /// Set the history window.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Set batch concurrency.
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    /// Set the per-value size limit.
    pub fn with_max_value_bytes(mut self, bytes: usize) -> Self {
        self.max_value_bytes = bytes;
        self
    }

    /// Connections are always opened read-only.
    pub fn read_only(&self) -> bool {
        true
    }

    /// Reject settings that would disable a safety bound.
    pub fn validate(&self) -> Result<()> {
        if self.row_limit_ceiling == 0 {
            return Err(SqlGuardError::Config(
                "row_limit_ceiling must be at least 1".into(),
            ));
        }
        if self.execution_timeout.is_zero() {
            return Err(SqlGuardError::Config(
                "execution_timeout must be greater than zero".into(),
            ));
        }
        if self.generation_timeout.is_zero() || self.interpretation_timeout.is_zero() {
            return Err(SqlGuardError::Config(
                "generation and interpretation timeouts must be greater than zero".into(),
            ));
        }
        if self.batch_concurrency == 0 {
            return Err(SqlGuardError::Config(
                "batch_concurrency must be at least 1".into(),
            ));
        }
        if self.max_value_bytes == 0 {
            return Err(SqlGuardError::Config(
                "max_value_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the OpenAI-compatible text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL (`/chat/completions` is appended).
    pub api_base: String,
    /// Bearer token. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_LLM_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            temperature: DEFAULT_LLM_TEMPERATURE,
            request_timeout: Duration::from_millis(DEFAULT_LLM_REQUEST_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.read_only());
        assert_eq!(config.row_limit_ceiling, DEFAULT_ROW_LIMIT_CEILING);
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let config = PipelineConfig::default().with_row_limit_ceiling(0);
        assert!(matches!(config.validate(), Err(SqlGuardError::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PipelineConfig::default().with_execution_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = PipelineConfig::default().with_batch_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_value_size_rejected() {
        let config = PipelineConfig::default().with_max_value_bytes(0);
        assert!(matches!(config.validate(), Err(SqlGuardError::Config(_))));
        assert_eq!(
            PipelineConfig::default().max_value_bytes,
            DEFAULT_MAX_VALUE_BYTES
        );
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = LlmConfig {
            api_key: Some("secret".into()),
            ..LlmConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
