//! Default constants for sqlguard configuration
//!
//! These constants define the default values used throughout the configuration
//! system when no explicit value is provided.

/// Default maximum number of rows ever returned by a query
pub const DEFAULT_ROW_LIMIT_CEILING: usize = 1000;

/// Default execution timeout in milliseconds
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for the SQL generation call in milliseconds
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 60_000;

/// Default timeout for the interpretation call in milliseconds
pub const DEFAULT_INTERPRETATION_TIMEOUT_MS: u64 = 60_000;

/// Default number of earlier (question, SQL) pairs offered to the generator
pub const DEFAULT_HISTORY_WINDOW: usize = 3;

/// Default number of sample rows captured per table for grounding
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

/// Default largest string or blob SQLite may build while executing, in bytes
pub const DEFAULT_MAX_VALUE_BYTES: usize = 16 * 1024 * 1024;

/// Default number of batch queries run at the same time (1 = sequential)
pub const DEFAULT_BATCH_CONCURRENCY: usize = 1;

/// Default OpenAI-compatible API base URL
pub const DEFAULT_LLM_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default model identifier
pub const DEFAULT_LLM_MODEL: &str = "qwen3-coder-plus";

/// Default HTTP request timeout for the LLM provider in milliseconds
pub const DEFAULT_LLM_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Default sampling temperature
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.0;

/// Default configuration file name searched in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "sqlguard.toml";
