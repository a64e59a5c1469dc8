//! Word lists used for sentiment labeling and stopword filtering.

use chatpulse_core::config::LexiconPaths;
use chatpulse_core::Error;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::config::StopwordMatch;
use crate::error::AnalysisResult;

/// Positive, negative and stopword sets, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
    stopwords: HashSet<String>,
    stopword_text: String,
}

impl Lexicon {
    /// Read the three word-list files.
    pub fn load(paths: &LexiconPaths) -> AnalysisResult<Self> {
        let positive = read_resource(&paths.positive_words)?;
        let negative = read_resource(&paths.negative_words)?;
        let stopwords = read_resource(&paths.stopwords)?;
        let lexicon = Self::from_sources(&positive, &negative, &stopwords);
        info!(
            "Loaded lexicon: {} positive, {} negative, {} stopwords",
            lexicon.positive.len(),
            lexicon.negative.len(),
            lexicon.stopwords.len()
        );
        Ok(lexicon)
    }

    /// Build a lexicon from in-memory word lists (one word per line).
    ///
    /// Words listed as both positive and negative are dropped from both.
    pub fn from_sources(positive: &str, negative: &str, stopwords: &str) -> Self {
        let mut positive = parse_word_list(positive);
        let mut negative = parse_word_list(negative);

        let overlap: Vec<String> = positive.intersection(&negative).cloned().collect();
        if !overlap.is_empty() {
            warn!(
                "Dropping {} words listed as both positive and negative",
                overlap.len()
            );
            for word in &overlap {
                positive.remove(word);
                negative.remove(word);
            }
        }

        Self {
            positive,
            negative,
            stopwords: parse_word_list(stopwords),
            stopword_text: stopwords.to_string(),
        }
    }

    /// Whether `word` is a positive opinion word.
    pub fn is_positive(&self, word: &str) -> bool {
        self.positive.contains(word)
    }

    /// Whether `word` is a negative opinion word.
    pub fn is_negative(&self, word: &str) -> bool {
        self.negative.contains(word)
    }

    /// Whether `token` is filtered out as a stopword under `mode`.
    pub fn is_stopword(&self, token: &str, mode: StopwordMatch) -> bool {
        match mode {
            StopwordMatch::Substring => self.stopword_text.contains(token),
            StopwordMatch::Exact => self.stopwords.contains(token),
        }
    }

    /// Number of positive words.
    pub fn positive_len(&self) -> usize {
        self.positive.len()
    }

    /// Number of negative words.
    pub fn negative_len(&self) -> usize {
        self.negative.len()
    }
}

fn read_resource(path: &Path) -> AnalysisResult<String> {
    let bytes = std::fs::read(path).map_err(|e| Error::resource_load(path, e))?;
    // Opinion lexicons are commonly distributed as Latin-1.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// One lowercase word per non-empty line; `;` starts a comment line.
fn parse_word_list(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .map(str::to_lowercase)
        .collect()
}
