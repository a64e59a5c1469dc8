//! Core types, errors, and configuration for Chatpulse.
//!
//! This crate provides the record model shared by the parser, the aggregate
//! engine and the CLI, together with the error taxonomy and the application
//! configuration.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::ChatpulseConfig;
pub use error::{Error, Result};
pub use types::*;
