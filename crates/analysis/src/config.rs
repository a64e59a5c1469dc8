use chatpulse_core::constants::{
    DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE, DEFAULT_TOP_USERS, DEFAULT_TOP_WORDS,
    DEFAULT_WORDCLOUD_WORDS,
};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Configuration for analysis features
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rows in the busiest-users chart
    pub top_users: usize,

    /// Rows in the most-common-words table
    pub top_words: usize,

    /// How tokens are tested against the stopword list
    pub stopword_match: StopwordMatch,

    /// Word cloud layout
    pub wordcloud: WordCloudConfig,

    /// Reference polarity scorer configuration
    pub sentiment: SentimentConfig,

    /// Classifier training configuration
    pub trainer: TrainerConfig,
}

/// Stopword matching strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StopwordMatch {
    /// Drop a token if it occurs anywhere in the raw stopword text.
    #[default]
    Substring,
    /// Drop a token only if it is a listed stopword.
    Exact,
}

/// Word cloud layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WordCloudConfig {
    /// Canvas width in pixels
    pub width: u32,

    /// Canvas height in pixels
    pub height: u32,

    /// Font size of the least frequent word
    pub min_font_size: f32,

    /// Font size of the most frequent word
    pub max_font_size: f32,

    /// Background color name
    pub background: String,

    /// Maximum number of words placed
    pub max_words: usize,
}

/// Polarity scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentConfig {
    /// Scores strictly above this are positive, strictly below its negation negative
    pub polarity_threshold: f64,

    /// Tokens after a negation that get flipped
    pub negation_window: usize,

    /// Multiplier applied after an intensifier
    pub intensifier_boost: f64,
}

/// Classifier training configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Share of rows held out for evaluation
    pub test_size: f64,

    /// Seed for the train/test shuffle
    pub seed: u64,

    /// Classifiers to fit
    pub classifiers: Vec<ClassifierKind>,

    /// Gradient descent step size for logistic regression
    pub learning_rate: f64,

    /// Gradient descent iterations for logistic regression
    pub epochs: usize,

    /// Inverse regularization strength for logistic regression
    pub inverse_regularization: f64,

    /// Additive smoothing for naive Bayes
    pub smoothing: f64,

    /// Vocabulary cap of the bag-of-words vectorizer
    pub max_features: usize,
}

/// Supported classifier families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Multinomial logistic regression.
    Logistic,
    /// Multinomial naive Bayes.
    NaiveBayes,
}

impl ClassifierKind {
    /// Stable name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Logistic => "logistic-regression",
            Self::NaiveBayes => "naive-bayes",
        }
    }
}

impl AnalysisConfig {
    /// Read the `[analysis]` table of a shared TOML configuration file.
    pub fn from_toml_str(content: &str) -> AnalysisResult<Self> {
        #[derive(Deserialize, Default)]
        struct Wrapper {
            #[serde(default)]
            analysis: AnalysisConfig,
        }

        let wrapper: Wrapper = toml::from_str(content)
            .map_err(|e| AnalysisError::Config(format!("Failed to parse analysis config: {}", e)))?;
        wrapper.analysis.validate()?;
        Ok(wrapper.analysis)
    }

    /// Reject values no aggregate can work with.
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(0.0..1.0).contains(&self.trainer.test_size) || self.trainer.test_size == 0.0 {
            return Err(AnalysisError::Config(format!(
                "trainer.test_size must be in (0, 1), got {}",
                self.trainer.test_size
            )));
        }
        if self.trainer.classifiers.is_empty() {
            return Err(AnalysisError::Config(
                "trainer.classifiers must name at least one classifier".to_string(),
            ));
        }
        if self.trainer.inverse_regularization <= 0.0 {
            return Err(AnalysisError::Config(
                "trainer.inverse_regularization must be positive".to_string(),
            ));
        }
        if self.trainer.max_features == 0 {
            return Err(AnalysisError::Config(
                "trainer.max_features must be positive".to_string(),
            ));
        }
        if self.wordcloud.min_font_size > self.wordcloud.max_font_size {
            return Err(AnalysisError::Config(
                "wordcloud.min_font_size exceeds max_font_size".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_users: DEFAULT_TOP_USERS,
            top_words: DEFAULT_TOP_WORDS,
            stopword_match: StopwordMatch::default(),
            wordcloud: WordCloudConfig::default(),
            sentiment: SentimentConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl Default for WordCloudConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            min_font_size: 10.0,
            max_font_size: 120.0,
            background: "white".to_string(),
            max_words: DEFAULT_WORDCLOUD_WORDS,
        }
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            polarity_threshold: 0.0,
            negation_window: 3,
            intensifier_boost: 1.5,
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SPLIT_SEED,
            classifiers: vec![ClassifierKind::Logistic, ClassifierKind::NaiveBayes],
            learning_rate: 0.5,
            epochs: 300,
            inverse_regularization: 1.0,
            smoothing: 1.0,
            max_features: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_yields_defaults() {
        let config = AnalysisConfig::from_toml_str("[logging]\nlevel = \"info\"\n")
            .expect("config should parse");
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.top_words, 20);
        assert_eq!(config.stopword_match, StopwordMatch::Substring);
    }

    #[test]
    fn analysis_table_overrides_fields() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[analysis]
top_words = 5
stopword_match = "exact"

[analysis.trainer]
classifiers = ["naive-bayes"]
seed = 7
"#,
        )
        .expect("config should parse");
        assert_eq!(config.top_words, 5);
        assert_eq!(config.stopword_match, StopwordMatch::Exact);
        assert_eq!(config.trainer.classifiers, vec![ClassifierKind::NaiveBayes]);
        assert_eq!(config.trainer.seed, 7);
        assert_eq!(config.trainer.test_size, 0.2);
    }

    #[test]
    fn out_of_range_test_size_is_rejected() {
        let err = AnalysisConfig::from_toml_str("[analysis.trainer]\ntest_size = 1.5\n")
            .expect_err("must fail");
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
