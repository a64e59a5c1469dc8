use thiserror::Error;

/// Errors that can occur during analysis operations.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Error raised by the shared core (format, resource, data errors).
    #[error(transparent)]
    Core(#[from] chatpulse_core::Error),
    /// Tensor computation error.
    #[error("Model error: {0}")]
    Model(String),
    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Training-store write or read error.
    #[error("Persistence error: {0}")]
    Persistence(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<candle_core::Error> for AnalysisError {
    fn from(e: candle_core::Error) -> Self {
        Self::Model(e.to_string())
    }
}

impl AnalysisError {
    /// Short name of the pipeline stage this error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Core(e) => e.stage(),
            Self::Model(_) => "train",
            Self::Csv(_) | Self::Persistence(_) => "training-store",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::InvalidInput(_) => "input",
        }
    }

    /// Whether the trainer rejected the table for lack of data.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::Core(chatpulse_core::Error::InsufficientData(_)))
    }

    /// Whether parsing found no recognizable export format.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Core(chatpulse_core::Error::Format(_)))
    }
}

/// Result type alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
