//! One-call analysis of a parsed chat for a single user filter.

use chatpulse_core::{ChatLog, UserFilter};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{AggregateCache, AggregateKind};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::lexicon::Lexicon;
use crate::ml::{SentimentTrainer, TrainingRun, TrainingSummary};
use crate::sentiment::PolarityScorer;
use crate::stats::{
    self, ActivityCount, BusyUsers, DailyTimelinePoint, EmojiCount, HeatMap, MessageStats,
    MonthlyTimelinePoint, TrainingRow, WordCloud, WordCount,
};

/// An aggregate that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportError {
    /// The missing aggregate.
    pub aggregate: AggregateKind,
    /// Pipeline stage that failed.
    pub stage: String,
    /// Error text.
    pub message: String,
}

impl ReportError {
    fn new(aggregate: AggregateKind, error: &AnalysisError) -> Self {
        Self {
            aggregate,
            stage: error.stage().to_string(),
            message: error.to_string(),
        }
    }
}

/// Everything shown for one user filter.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReport {
    /// Filter the report was built for.
    pub user: UserFilter,
    /// Export layout the log was parsed with.
    pub format: String,
    /// Top statistics.
    pub stats: MessageStats,
    /// Messages per calendar month.
    pub monthly_timeline: Vec<MonthlyTimelinePoint>,
    /// Messages per day.
    pub daily_timeline: Vec<DailyTimelinePoint>,
    /// Busiest weekdays first.
    pub week_activity: Vec<ActivityCount>,
    /// Busiest months first.
    pub month_activity: Vec<ActivityCount>,
    /// Weekday by hour-bucket counts.
    pub heat_map: HeatMap,
    /// Only present for the overall view.
    pub busy_users: Option<BusyUsers>,
    /// Most frequent non-stopwords.
    pub common_words: Vec<WordCount>,
    /// Word cloud data.
    pub word_cloud: WordCloud,
    /// Emoji frequencies.
    pub emojis: Vec<EmojiCount>,
    /// Classifier scores, when training was requested and succeeded.
    pub sentiment: Option<TrainingSummary>,
    /// Aggregates that could not be produced.
    pub errors: Vec<ReportError>,
}

/// Lexicon, configuration and aggregate cache shared by every query.
#[derive(Debug)]
pub struct Analyzer {
    lexicon: Lexicon,
    config: AnalysisConfig,
    cache: AggregateCache,
}

impl Analyzer {
    /// Create an analyzer with an empty cache.
    pub fn new(lexicon: Lexicon, config: AnalysisConfig) -> Self {
        Self {
            lexicon,
            config,
            cache: AggregateCache::new(),
        }
    }

    /// Word lists used for stopwords and labels.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Aggregate cache, for hit counts and invalidation.
    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    /// Cached [`stats::fetch_stats`].
    pub fn stats(&self, log: &ChatLog, filter: &UserFilter) -> MessageStats {
        self.cache.get_or_compute(AggregateKind::Stats, filter, log.id(), || {
            stats::fetch_stats(filter, log.records())
        })
    }

    /// Cached [`stats::monthly_timeline`].
    pub fn monthly_timeline(&self, log: &ChatLog, filter: &UserFilter) -> Vec<MonthlyTimelinePoint> {
        self.cache.get_or_compute(AggregateKind::MonthlyTimeline, filter, log.id(), || {
            stats::monthly_timeline(filter, log.records())
        })
    }

    /// Cached [`stats::daily_timeline`].
    pub fn daily_timeline(&self, log: &ChatLog, filter: &UserFilter) -> Vec<DailyTimelinePoint> {
        self.cache.get_or_compute(AggregateKind::DailyTimeline, filter, log.id(), || {
            stats::daily_timeline(filter, log.records())
        })
    }

    /// Cached [`stats::week_activity_map`].
    pub fn week_activity(&self, log: &ChatLog, filter: &UserFilter) -> Vec<ActivityCount> {
        self.cache.get_or_compute(AggregateKind::WeekActivity, filter, log.id(), || {
            stats::week_activity_map(filter, log.records())
        })
    }

    /// Cached [`stats::month_activity_map`].
    pub fn month_activity(&self, log: &ChatLog, filter: &UserFilter) -> Vec<ActivityCount> {
        self.cache.get_or_compute(AggregateKind::MonthActivity, filter, log.id(), || {
            stats::month_activity_map(filter, log.records())
        })
    }

    /// Cached [`stats::activity_heat_map`].
    pub fn heat_map(&self, log: &ChatLog, filter: &UserFilter) -> HeatMap {
        self.cache.get_or_compute(AggregateKind::HeatMap, filter, log.id(), || {
            stats::activity_heat_map(filter, log.records())
        })
    }

    /// Cached [`stats::most_busy_users`].
    pub fn busy_users(&self, log: &ChatLog, filter: &UserFilter) -> BusyUsers {
        self.cache.get_or_compute(AggregateKind::BusyUsers, filter, log.id(), || {
            stats::most_busy_users(filter, log.records(), self.config.top_users)
        })
    }

    /// Cached [`stats::most_common_words`] with the configured stopword mode.
    pub fn common_words(&self, log: &ChatLog, filter: &UserFilter) -> Vec<WordCount> {
        self.cache.get_or_compute(AggregateKind::CommonWords, filter, log.id(), || {
            stats::most_common_words(
                filter,
                log.records(),
                &self.lexicon,
                self.config.stopword_match,
                self.config.top_words,
            )
        })
    }

    /// Cached [`stats::create_wordcloud`].
    pub fn word_cloud(&self, log: &ChatLog, filter: &UserFilter) -> WordCloud {
        self.cache.get_or_compute(AggregateKind::WordCloud, filter, log.id(), || {
            stats::create_wordcloud(
                filter,
                log.records(),
                &self.lexicon,
                self.config.stopword_match,
                &self.config.wordcloud,
            )
        })
    }

    /// Cached [`stats::get_emojis`].
    pub fn emojis(&self, log: &ChatLog, filter: &UserFilter) -> Vec<EmojiCount> {
        self.cache.get_or_compute(AggregateKind::Emojis, filter, log.id(), || {
            stats::get_emojis(filter, log.records())
        })
    }

    /// Cleaned, heuristically labeled rows for the filter.
    pub fn training_data(&self, log: &ChatLog, filter: &UserFilter) -> Vec<TrainingRow> {
        self.cache.get_or_compute(AggregateKind::TrainingData, filter, log.id(), || {
            stats::generate_training_data(filter, log.records(), &self.lexicon)
        })
    }

    /// Fit the configured classifiers on `rows`, compared against the
    /// polarity scorer.
    pub fn train_rows(&self, rows: &[TrainingRow]) -> AnalysisResult<TrainingRun> {
        let reference = PolarityScorer::new(&self.lexicon, self.config.sentiment.clone());
        SentimentTrainer::new(self.config.trainer.clone()).train(rows, &reference)
    }

    /// Training summary over the filter's training data.
    pub fn sentiment_summary(&self, log: &ChatLog, filter: &UserFilter) -> AnalysisResult<TrainingSummary> {
        self.cache
            .try_get_or_compute(AggregateKind::TrainingSummary, filter, log.id(), || {
                let rows = self.training_data(log, filter);
                Ok(self.train_rows(&rows)?.summary)
            })
    }

    /// Build the full report; a failed aggregate is listed in
    /// [`ChatReport::errors`] and the rest still render.
    pub fn report(&self, log: &ChatLog, filter: &UserFilter, with_sentiment: bool) -> ChatReport {
        let mut errors = Vec::new();

        let sentiment = if with_sentiment {
            match self.sentiment_summary(log, filter) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping sentiment training for {}: {}", filter, e);
                    errors.push(ReportError::new(AggregateKind::TrainingSummary, &e));
                    None
                }
            }
        } else {
            None
        };

        let report = ChatReport {
            user: filter.clone(),
            format: log.format().to_string(),
            stats: self.stats(log, filter),
            monthly_timeline: self.monthly_timeline(log, filter),
            daily_timeline: self.daily_timeline(log, filter),
            week_activity: self.week_activity(log, filter),
            month_activity: self.month_activity(log, filter),
            heat_map: self.heat_map(log, filter),
            busy_users: filter.is_overall().then(|| self.busy_users(log, filter)),
            common_words: self.common_words(log, filter),
            word_cloud: self.word_cloud(log, filter),
            emojis: self.emojis(log, filter),
            sentiment,
            errors,
        };
        info!(
            "Built report for {}: {} messages, {} errors",
            filter,
            report.stats.messages,
            report.errors.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse;

    const EXPORT: &str = "\
1/1/24, 10:00 - Alice: morning all
1/1/24, 10:05 - Bob: news at noon
1/1/24, 10:06 - Alice: see you soon
";

    fn analyzer() -> Analyzer {
        Analyzer::new(
            Lexicon::from_sources("good\n", "bad\n", "the\n"),
            AnalysisConfig::default(),
        )
    }

    #[test]
    fn report_uses_cache_on_repeat() {
        let analyzer = analyzer();
        let log = parse(EXPORT).expect("export parses");

        let first = analyzer.report(&log, &UserFilter::Overall, false);
        let misses = analyzer.cache().misses();
        let second = analyzer.report(&log, &UserFilter::Overall, false);

        assert_eq!(first.stats, second.stats);
        assert_eq!(analyzer.cache().misses(), misses);
        assert!(analyzer.cache().hits() >= misses);
    }

    #[test]
    fn busy_users_only_in_overall_view() {
        let analyzer = analyzer();
        let log = parse(EXPORT).expect("export parses");

        let overall = analyzer.report(&log, &UserFilter::Overall, false);
        assert!(overall.busy_users.is_some());

        let alice = analyzer.report(&log, &UserFilter::from("Alice"), false);
        assert!(alice.busy_users.is_none());
        assert_eq!(alice.stats.messages, 2);
    }

    #[test]
    fn failed_training_is_reported_not_fatal() {
        let analyzer = analyzer();
        let log = parse(EXPORT).expect("export parses");

        let report = analyzer.report(&log, &UserFilter::Overall, true);
        assert!(report.sentiment.is_none());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].aggregate, AggregateKind::TrainingSummary);
        assert_eq!(report.errors[0].stage, "train");
        assert_eq!(report.stats.messages, 3);
        assert!(!report.common_words.is_empty());
    }

    #[test]
    fn report_serializes_to_json() {
        let analyzer = analyzer();
        let log = parse(EXPORT).expect("export parses");
        let report = analyzer.report(&log, &UserFilter::from("Bob"), false);
        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["user"], "Bob");
        assert_eq!(json["stats"]["messages"], 1);
        assert!(json["busy_users"].is_null());
    }
}
