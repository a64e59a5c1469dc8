//! Error types for CLI operations.

use chatpulse_analysis::AnalysisError;
use thiserror::Error;

/// Main error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed.
    #[error("{stage} failed: {source}")]
    Analysis {
        /// Stage name such as `parse`, `lexicon` or `train`.
        stage: &'static str,
        /// Underlying error.
        #[source]
        source: AnalysisError,
    },

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Text rendering error.
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),
}

impl From<AnalysisError> for CliError {
    fn from(source: AnalysisError) -> Self {
        Self::Analysis {
            stage: source.stage(),
            source,
        }
    }
}

impl From<chatpulse_core::Error> for CliError {
    fn from(e: chatpulse_core::Error) -> Self {
        match e {
            chatpulse_core::Error::Config(msg) => Self::Config(msg),
            other => AnalysisError::from(other).into(),
        }
    }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_errors_name_their_stage() {
        let err: CliError = AnalysisError::from(chatpulse_core::Error::format("no timestamps")).into();
        assert!(err.to_string().starts_with("parse failed:"));

        let err: CliError = chatpulse_core::Error::insufficient_data("one class").into();
        assert!(err.to_string().starts_with("train failed:"));
    }

    #[test]
    fn core_config_errors_stay_config_errors() {
        let err: CliError = chatpulse_core::Error::config("bad toml").into();
        assert!(matches!(err, CliError::Config(_)));
    }
}
