//! Error hints for actionable CLI messages

use super::{ErrorKind, PipelineError, SqlGuardError};

/// Extension trait for adding hints to errors
pub trait ErrorHint {
    /// Get a helpful hint for resolving this error
    fn hint(&self) -> Option<String>;

    /// Format the error with hint for display
    fn with_hint(&self) -> String;
}

fn kind_hint(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::EmptyInput => {
            "The generator produced no SQL. Rephrase the question or check the model output with `--verbose`."
        }
        ErrorKind::MultiStatement => {
            "Only a single statement may run per question. Ask one question at a time."
        }
        ErrorKind::ForbiddenOperation => {
            "Only read-only SELECT queries are executed. Rephrase the question as a lookup rather than a change."
        }
        ErrorKind::SchemaUnavailable => {
            "The database could not be read. Check the path and inspect it with: `sqlguard schema <DB>`"
        }
        ErrorKind::GenerationFailed => {
            "SQL generation failed. Check `SQLGUARD_API_KEY`, `SQLGUARD_API_BASE` and the model name, or raise `--generation-timeout-ms`."
        }
        ErrorKind::ExecutionFailed => {
            "SQLite rejected the statement. Compare the referenced tables and columns with: `sqlguard schema <DB>`"
        }
        ErrorKind::Timeout => {
            "The query was aborted after the execution timeout. Narrow the question or raise `--execution-timeout-ms`."
        }
        ErrorKind::InterpretationFailed => {
            "The result was computed but could not be explained. The raw rows are shown above."
        }
    }
}

impl ErrorHint for PipelineError {
    fn hint(&self) -> Option<String> {
        Some(kind_hint(self.kind).to_string())
    }

    fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

impl ErrorHint for SqlGuardError {
    fn hint(&self) -> Option<String> {
        match self {
            SqlGuardError::Pipeline(e) => e.hint(),
            SqlGuardError::Config(msg) if msg.contains("read_only") => Some(
                "Read-only mode is a safety invariant and cannot be disabled; remove `read_only` from the config file.".into(),
            ),
            SqlGuardError::Config(_) => Some(
                "Check the configuration file. Print a complete example with: `sqlguard config --example`".into(),
            ),
            SqlGuardError::Network(_) => Some(
                "Could not reach the text-generation service. Verify `SQLGUARD_API_BASE` and network connectivity.".into(),
            ),
            _ => None,
        }
    }

    fn with_hint(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_hint() {
        for kind in ErrorKind::ALL {
            let err = PipelineError::new(kind, "detail");
            assert!(err.hint().is_some(), "missing hint for {}", kind);
        }
    }

    #[test]
    fn test_with_hint_includes_error_text() {
        let err = SqlGuardError::Config("read_only cannot be disabled".into());
        let text = err.with_hint();
        assert!(text.contains("read_only cannot be disabled"));
        assert!(text.contains("hint:"));
    }

    #[test]
    fn test_internal_has_no_hint() {
        assert!(SqlGuardError::Internal("bug".into()).hint().is_none());
    }
}
