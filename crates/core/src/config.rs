use crate::constants::{
    NEGATIVE_WORDS_FILE, POSITIVE_WORDS_FILE, STOPWORDS_FILE, TRAINING_DATA_FILE,
};
use crate::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for Chatpulse.
///
/// Loaded from a TOML file; every field has a default so partial files are
/// accepted. Tables owned by other crates (such as `[analysis]`) are
/// ignored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatpulseConfig {
    /// Word-list resources.
    pub lexicon: LexiconPaths,

    /// Where consented training rows accumulate.
    pub training_data_path: PathBuf,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Locations of the three word-list files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LexiconPaths {
    /// Positive opinion words, one per line.
    pub positive_words: PathBuf,

    /// Negative opinion words, one per line.
    pub negative_words: PathBuf,

    /// Stopwords, one per line.
    pub stopwords: PathBuf,
}

impl LexiconPaths {
    /// Default file names resolved inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            positive_words: dir.join(POSITIVE_WORDS_FILE),
            negative_words: dir.join(NEGATIVE_WORDS_FILE),
            stopwords: dir.join(STOPWORDS_FILE),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when the command line does not raise it.
    pub level: LogLevel,

    /// Include event targets in log lines.
    pub show_target: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level.
    Error,

    /// Warning level.
    Warn,

    /// Info level.
    Info,

    /// Debug level.
    Debug,

    /// Trace level.
    Trace,
}

impl LogLevel {
    /// Raise the level by `steps` verbosity flags.
    pub fn raised_by(self, steps: u8) -> Self {
        let levels = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];
        let current = levels.iter().position(|l| *l == self).unwrap_or(1);
        let idx = (current + steps as usize).min(levels.len() - 1);
        levels[idx]
    }
}

impl ChatpulseConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Point every lexicon file at `dir`, keeping default file names.
    pub fn with_lexicon_dir(mut self, dir: &Path) -> Self {
        self.lexicon = LexiconPaths::in_dir(dir);
        self
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatpulse")
}

impl Default for ChatpulseConfig {
    fn default() -> Self {
        Self {
            lexicon: LexiconPaths::default(),
            training_data_path: default_data_dir().join(TRAINING_DATA_FILE),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LexiconPaths {
    fn default() -> Self {
        Self::in_dir(&default_data_dir().join("lexicon"))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            show_target: false,
        }
    }
}
