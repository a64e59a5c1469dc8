use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Words of two or more word characters.
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Lowercased vectorizer tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Sparse term-count rows over a fixed vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    rows: Vec<Vec<(usize, f32)>>,
    n_features: usize,
}

impl FeatureMatrix {
    /// Number of documents.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Vocabulary size.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Non-zero `(feature, count)` pairs of one row, ascending by feature.
    pub fn row(&self, idx: usize) -> &[(usize, f32)] {
        &self.rows[idx]
    }

    /// Iterate rows.
    pub fn rows(&self) -> impl Iterator<Item = &[(usize, f32)]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Row-major dense copy, `n_rows * n_features` values.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0f32; self.rows.len() * self.n_features];
        for (r, row) in self.rows.iter().enumerate() {
            let base = r * self.n_features;
            for &(c, v) in row {
                dense[base + c] = v;
            }
        }
        dense
    }
}

/// Bag-of-words count vectorizer.
///
/// The vocabulary is sorted alphabetically; when `max_features` is set only
/// the most frequent terms of the fitted corpus are kept.
#[derive(Debug, Clone, Default)]
pub struct BagOfWords {
    vocabulary: HashMap<String, usize>,
    terms: Vec<String>,
    max_features: Option<usize>,
}

impl BagOfWords {
    /// Unlimited vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_features` terms.
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Learn the vocabulary from `documents`.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            for token in tokenize(doc.as_ref()) {
                *term_counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = term_counts.into_iter().collect();
        if let Some(limit) = self.max_features {
            terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            terms.truncate(limit);
        }
        let mut terms: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        self.vocabulary = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.terms = terms;
    }

    /// Count vocabulary terms of each document; unknown terms are ignored.
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> FeatureMatrix {
        let rows = documents
            .iter()
            .map(|doc| self.transform_one(doc.as_ref()))
            .collect();
        FeatureMatrix {
            rows,
            n_features: self.terms.len(),
        }
    }

    /// Fit, then transform the same documents.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> FeatureMatrix {
        self.fit(documents);
        self.transform(documents)
    }

    fn transform_one(&self, document: &str) -> Vec<(usize, f32)> {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for token in tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut row: Vec<(usize, f32)> = counts.into_iter().collect();
        row.sort_by_key(|&(idx, _)| idx);
        row
    }

    /// Vocabulary size.
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    /// Terms in feature order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}
