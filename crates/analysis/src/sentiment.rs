//! Sentiment labelers sharing one interface, so heuristic, reference and
//! trained labels can be swapped and compared.

use chatpulse_core::{MessageRecord, Sentiment};

use crate::config::SentimentConfig;
use crate::error::AnalysisResult;
use crate::lexicon::Lexicon;
use crate::nlp::normalize_token;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nor", "none", "nobody", "nothing", "neither", "cannot", "without",
];

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "so",
    "too",
    "super",
    "totally",
    "absolutely",
    "highly",
    "incredibly",
];

/// Anything that can put a sentiment label on message text.
pub trait SentimentLabeler {
    /// Name used in comparison reports.
    fn name(&self) -> &str;

    /// Label one message text.
    fn label(&self, text: &str) -> AnalysisResult<Sentiment>;

    /// Label a parsed record by its body.
    fn label_record(&self, record: &MessageRecord) -> AnalysisResult<Sentiment> {
        self.label(&record.body)
    }

    /// Label many texts.
    fn label_all(&self, texts: &[String]) -> AnalysisResult<Vec<Sentiment>> {
        texts.iter().map(|text| self.label(text)).collect()
    }
}

/// Majority vote of positive against negative lexicon hits.
#[derive(Debug, Clone, Copy)]
pub struct LexiconLabeler<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> LexiconLabeler<'a> {
    /// Label with `lexicon`.
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    /// Positive and negative hit counts over whitespace tokens.
    ///
    /// Tokens are lowercased and stripped of outer punctuation before the
    /// lookup, so `"Good!"` and `"(bad)"` count as hits. Matching the raw
    /// tokens exactly would label such messages neutral.
    pub fn counts(&self, text: &str) -> (usize, usize) {
        text.split_whitespace()
            .map(normalize_token)
            .fold((0, 0), |(pos, neg), token| {
                (
                    pos + usize::from(self.lexicon.is_positive(&token)),
                    neg + usize::from(self.lexicon.is_negative(&token)),
                )
            })
    }

    /// Infallible form of [`SentimentLabeler::label`].
    pub fn classify(&self, text: &str) -> Sentiment {
        let (positive, negative) = self.counts(text);
        Sentiment::from_counts(positive, negative)
    }
}

impl SentimentLabeler for LexiconLabeler<'_> {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn label(&self, text: &str) -> AnalysisResult<Sentiment> {
        Ok(self.classify(text))
    }
}

/// Continuous polarity in `[-1, 1]` with negation and intensifier handling.
///
/// Used as an independent reference to compare trained classifiers against.
#[derive(Debug, Clone)]
pub struct PolarityScorer<'a> {
    lexicon: &'a Lexicon,
    config: SentimentConfig,
}

impl<'a> PolarityScorer<'a> {
    /// Score with `lexicon`.
    pub fn new(lexicon: &'a Lexicon, config: SentimentConfig) -> Self {
        Self { lexicon, config }
    }

    /// Mean signed score of lexicon hits, 0.0 without hits.
    pub fn score(&self, text: &str) -> f64 {
        let mut hits = Vec::new();
        let mut boost = 1.0;
        let mut negation_left = 0usize;

        for token in text.split_whitespace().map(normalize_token) {
            if token.is_empty() {
                continue;
            }
            if is_negation(&token) {
                negation_left = self.config.negation_window;
                continue;
            }
            if INTENSIFIERS.contains(&token.as_str()) {
                boost = self.config.intensifier_boost;
                continue;
            }

            let base = if self.lexicon.is_positive(&token) {
                Some(1.0)
            } else if self.lexicon.is_negative(&token) {
                Some(-1.0)
            } else {
                None
            };

            if let Some(base) = base {
                let mut score = base * boost;
                if negation_left > 0 {
                    score *= -0.5;
                }
                hits.push(score);
            }
            boost = 1.0;
            negation_left = negation_left.saturating_sub(1);
        }

        if hits.is_empty() {
            return 0.0;
        }
        let mean = hits.iter().sum::<f64>() / hits.len() as f64;
        mean.clamp(-1.0, 1.0)
    }

    /// Label implied by [`PolarityScorer::score`].
    pub fn classify(&self, text: &str) -> Sentiment {
        let score = self.score(text);
        let threshold = self.config.polarity_threshold;
        if score > threshold {
            Sentiment::Positive
        } else if score < -threshold {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl SentimentLabeler for PolarityScorer<'_> {
    fn name(&self) -> &str {
        "polarity"
    }

    fn label(&self, text: &str) -> AnalysisResult<Sentiment> {
        Ok(self.classify(text))
    }
}

fn is_negation(token: &str) -> bool {
    NEGATIONS.contains(&token) || token.ends_with("n't")
}

/// Share of positions where two label sequences agree; 0.0 when empty.
pub fn agreement_rate(a: &[Sentiment], b: &[Sentiment]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let agree = a.iter().zip(b).filter(|(x, y)| x == y).count();
    agree as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::from_sources("good\nhappy\ngreat\nlove\n", "bad\nsad\nhate\nterrible\n", "")
    }

    #[test]
    fn lexicon_labeler_uses_strict_majority() {
        let lexicon = lexicon();
        let labeler = LexiconLabeler::new(&lexicon);
        assert_eq!(labeler.classify("good good bad"), Sentiment::Positive);
        assert_eq!(labeler.classify("sad and bad, but happy"), Sentiment::Negative);
        assert_eq!(labeler.classify("Good day, bad night"), Sentiment::Neutral);
        assert_eq!(labeler.classify("nothing to see"), Sentiment::Neutral);
        assert_eq!(labeler.classify(""), Sentiment::Neutral);
    }

    #[test]
    fn lexicon_lookup_ignores_case_and_outer_punctuation() {
        let lexicon = lexicon();
        let labeler = LexiconLabeler::new(&lexicon);
        assert_eq!(labeler.counts("Good!"), (1, 0));
        assert_eq!(labeler.counts("GREAT... (bad)"), (1, 1));
        assert_eq!(labeler.classify("Good!"), Sentiment::Positive);
        assert_eq!(labeler.counts("goodness"), (0, 0));
    }

    #[test]
    fn lexicon_labeler_is_deterministic() {
        let lexicon = lexicon();
        let labeler = LexiconLabeler::new(&lexicon);
        let first = labeler.label("I love it but hate the rain").expect("label");
        let second = labeler.label("I love it but hate the rain").expect("label");
        assert_eq!(first, Sentiment::Neutral);
        assert_eq!(first, second);
    }

    #[test]
    fn polarity_flips_under_negation() {
        let lexicon = lexicon();
        let scorer = PolarityScorer::new(&lexicon, SentimentConfig::default());
        assert_eq!(scorer.score("good"), 1.0);
        assert_eq!(scorer.score("not good"), -0.5);
        assert_eq!(scorer.classify("not good"), Sentiment::Negative);
        assert_eq!(scorer.classify("don't hate it"), Sentiment::Positive);
    }

    #[test]
    fn polarity_intensifiers_are_clamped() {
        let lexicon = lexicon();
        let scorer = PolarityScorer::new(&lexicon, SentimentConfig::default());
        assert_eq!(scorer.score("very great"), 1.0);
        assert_eq!(scorer.score("very great but bad"), 0.25);
        assert_eq!(scorer.score("no idea"), 0.0);
    }

    #[test]
    fn polarity_threshold_widens_neutral_band() {
        let lexicon = lexicon();
        let config = SentimentConfig {
            polarity_threshold: 0.3,
            ..SentimentConfig::default()
        };
        let scorer = PolarityScorer::new(&lexicon, config);
        assert_eq!(scorer.classify("very great but bad"), Sentiment::Neutral);
    }

    #[test]
    fn labelers_share_one_interface() {
        let lexicon = lexicon();
        let labelers: Vec<Box<dyn SentimentLabeler + '_>> = vec![
            Box::new(LexiconLabeler::new(&lexicon)),
            Box::new(PolarityScorer::new(&lexicon, SentimentConfig::default())),
        ];
        let texts = vec!["love".to_string(), "hate".to_string()];
        for labeler in &labelers {
            let labels = labeler.label_all(&texts).expect("labels");
            assert_eq!(labels, vec![Sentiment::Positive, Sentiment::Negative], "{}", labeler.name());
        }
    }

    #[test]
    fn agreement_counts_matching_positions() {
        let a = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative, Sentiment::Neutral];
        let b = [Sentiment::Positive, Sentiment::Negative, Sentiment::Negative, Sentiment::Neutral];
        assert_eq!(agreement_rate(&a, &b), 0.75);
        assert_eq!(agreement_rate(&[], &[]), 0.0);
    }
}
