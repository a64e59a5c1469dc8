//! Error types for Chatpulse core functionality.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Chatpulse.
#[derive(Error, Debug)]
pub enum Error {
    /// No recognized timestamp pattern in the export, or a matched
    /// timestamp that does not form a valid date.
    #[error("Format error: {0}")]
    Format(String),

    /// Not enough labeled data to train a classifier.
    #[error("Insufficient training data: {0}")]
    InsufficientData(String),

    /// A lexicon or stopword resource could not be read.
    #[error("Failed to load resource {}: {source}", path.display())]
    ResourceLoad {
        /// Path of the resource.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed value
    #[error("Data parsing error: {0}")]
    Parse(String),
}

/// Result type for Chatpulse operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a format error
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an insufficient-data error
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an I/O failure on a named resource.
    pub fn resource_load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ResourceLoad {
            path: path.into(),
            source,
        }
    }

    /// Short name of the pipeline stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Format(_) => "parse",
            Self::InsufficientData(_) => "train",
            Self::ResourceLoad { .. } => "lexicon",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_load_message_names_the_path() {
        let err = Error::resource_load(
            "lexicon/positive-words.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let text = err.to_string();
        assert!(text.contains("lexicon/positive-words.txt"));
        assert_eq!(err.stage(), "lexicon");
    }

    #[test]
    fn format_errors_belong_to_parse_stage() {
        assert_eq!(Error::format("no timestamp").stage(), "parse");
        assert_eq!(Error::insufficient_data("empty").stage(), "train");
    }
}
