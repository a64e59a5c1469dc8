//! Application constants and configuration defaults.

/// Sender recorded for lines without a `name: ` prefix.
pub const NOTIFICATION_SENDER: &str = "group notification";

/// Body the exporter writes in place of attachments.
pub const MEDIA_PLACEHOLDER: &str = "<Media omitted>";

/// Filter value meaning "all users".
pub const OVERALL: &str = "Overall";

/// Rows returned by the busiest-users chart.
pub const DEFAULT_TOP_USERS: usize = 5;

/// Rows returned by the most-common-words table.
pub const DEFAULT_TOP_WORDS: usize = 20;

/// Maximum entries in a word cloud.
pub const DEFAULT_WORDCLOUD_WORDS: usize = 200;

/// Held-out share of the training table.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Seed of the train/test shuffle.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Default lexicon file names, resolved against the lexicon directory.
pub const POSITIVE_WORDS_FILE: &str = "positive-words.txt";
pub const NEGATIVE_WORDS_FILE: &str = "negative-words.txt";
pub const STOPWORDS_FILE: &str = "stop_hinglish.txt";

/// Default file that accumulates consented training rows.
pub const TRAINING_DATA_FILE: &str = "training_data.csv";
