//! Command-line interface for chatpulse.
//!
//! This crate parses arguments, loads configuration and lexicon resources,
//! and prints chat analysis reports and sentiment training results.

#![deny(missing_docs, unsafe_code)]

/// CLI command definitions and parsing.
pub mod commands;

/// CLI application entry point and configuration.
pub mod app;

/// Error types for CLI operations.
pub mod error;
