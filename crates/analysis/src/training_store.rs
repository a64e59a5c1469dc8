//! Consent-gated accumulation of labeled training rows in a CSV file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AnalysisError, AnalysisResult};
use crate::stats::TrainingRow;

const HEADER: [&str; 2] = ["message", "sentiment"];

/// Whether the user agreed to have their messages stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    /// Rows may be written.
    Granted,
    /// Nothing is written.
    Denied,
}

impl From<bool> for Consent {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// CSV file with a `message,sentiment` header that rows are appended to.
#[derive(Debug, Clone)]
pub struct TrainingStore {
    path: PathBuf,
}

impl TrainingStore {
    /// Store backed by `path`; nothing is touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `rows` if consent was granted. Returns the number of rows written.
    ///
    /// A new file gets the header; an existing one only gets the rows. Each
    /// call issues a single write.
    pub fn append(&self, rows: &[TrainingRow], consent: Consent) -> AnalysisResult<usize> {
        if consent == Consent::Denied {
            debug!("Training data not stored: consent denied");
            return Ok(0);
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let body = encode_rows(rows)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                let mut buffer = encode_header()?;
                buffer.extend_from_slice(&body);
                file.write_all(&buffer)?;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let mut file = OpenOptions::new().append(true).open(&self.path)?;
                file.write_all(&body)?;
            }
            Err(e) => return Err(e.into()),
        }

        info!("Stored {} training rows in {}", rows.len(), self.path.display());
        Ok(rows.len())
    }

    /// Every row stored so far; empty when the file does not exist.
    pub fn load(&self) -> AnalysisResult<Vec<TrainingRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader
            .deserialize::<TrainingRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn encode_header() -> AnalysisResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    finish(writer)
}

fn encode_rows(rows: &[TrainingRow]) -> AnalysisResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> AnalysisResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| AnalysisError::Persistence(format!("flush csv buffer: {}", e)))
}
