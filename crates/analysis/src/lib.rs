//! Chat export parsing, aggregate statistics and sentiment training for
//! chatpulse.
//!
//! This crate turns a plain-text chat export into an immutable record set,
//! computes per-user aggregates over it, and trains sentiment classifiers
//! on heuristically labeled messages.

#![deny(missing_docs, unsafe_code)]

/// Text cleanup, emoji and URL extraction.
pub mod nlp;

/// Opinion lexicon and stopword list.
pub mod lexicon;

/// Chat export parsers.
pub mod parsers;

/// Aggregate statistics over record sets.
pub mod stats;

/// Bag-of-words feature extraction.
pub mod features;

/// Sentiment labelers.
pub mod sentiment;

/// Classifiers, evaluation and training.
pub mod ml;

/// Aggregate cache.
pub mod cache;

/// Per-filter analysis reports.
pub mod report;

/// Consent-gated training data persistence.
pub mod training_store;

/// Error types for analysis operations.
pub mod error;

/// Configuration for analysis modules.
pub mod config;

pub use cache::{AggregateCache, AggregateKind};
pub use config::{AnalysisConfig, ClassifierKind, StopwordMatch};
pub use error::{AnalysisError, AnalysisResult};
pub use lexicon::Lexicon;
pub use ml::{SentimentTrainer, TrainedModel, TrainingSummary};
pub use parsers::{ChatParser, ExportFormat};
pub use report::{Analyzer, ChatReport};
pub use sentiment::{LexiconLabeler, PolarityScorer, SentimentLabeler};
pub use training_store::{Consent, TrainingStore};
