//! Linter error types.

use thiserror::Error;

/// Errors that can occur while configuring or running the external linter.
#[derive(Debug, Error)]
pub enum LinterError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The linter program could not be started.
    #[error("Failed to start linter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The linter process exited unsuccessfully.
    #[error("Linter process failed: {0}")]
    Process(String),

    /// The linter produced output that is not a list of findings.
    #[error("Invalid linter output: {0}")]
    Output(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LinterError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a spawn error for the given program.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a process error.
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process(message.into())
    }

    /// Creates an output error.
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_names_program() {
        let err = LinterError::spawn(
            "htmllinter-run",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to start linter 'htmllinter-run': not found"
        );
    }

    #[test]
    fn test_helpers_pick_variant() {
        assert!(matches!(LinterError::config("x"), LinterError::Config(_)));
        assert!(matches!(LinterError::process("x"), LinterError::Process(_)));
        assert!(matches!(LinterError::output("x"), LinterError::Output(_)));
    }
}
