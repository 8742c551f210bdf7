//! External text-generation collaborators
//!
//! The pipeline depends on [`SqlGenerator`] and [`ResultInterpreter`] only.
//! The LLM-backed implementations build prompts and delegate to an
//! [`LlmProvider`]; tests and literal-SQL runs plug in their own.

pub mod generator;
pub mod interpreter;
pub mod provider;

pub use generator::{
    build_generation_prompt, FixedSqlGenerator, GenerationRequest, LlmSqlGenerator, SqlGenerator,
};
pub use interpreter::{
    build_interpretation_prompt, InterpretationRequest, LlmInterpreter, ResultInterpreter,
    SummaryInterpreter,
};
pub use provider::{LlmProvider, OpenAiCompatibleProvider};
