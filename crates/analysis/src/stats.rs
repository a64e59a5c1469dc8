//! Aggregates over a parsed record set.
//!
//! Every function takes a [`UserFilter`] and the immutable records and is
//! pure. A filter that leaves no records yields zero counts and empty tables.

use chatpulse_core::types::{hour_bucket, WEEKDAY_NAMES};
use chatpulse_core::{MessageRecord, Sentiment, UserFilter};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::config::{StopwordMatch, WordCloudConfig};
use crate::lexicon::Lexicon;
use crate::nlp;
use crate::sentiment::LexiconLabeler;

/// Headline counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageStats {
    /// Messages after filtering.
    pub messages: usize,
    /// Whitespace tokens over non-media bodies.
    pub words: usize,
    /// Media placeholder messages.
    pub media: usize,
    /// URLs found in bodies.
    pub links: usize,
}

impl MessageStats {
    /// `(messages, words, media, links)`.
    pub fn as_tuple(&self) -> (usize, usize, usize, usize) {
        (self.messages, self.words, self.media, self.links)
    }
}

/// Messages per calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTimelinePoint {
    /// Calendar year.
    pub year: i32,
    /// Month number, 1 to 12.
    pub month_num: u32,
    /// English month name.
    pub month: String,
    /// Axis label, `"January-2024"`.
    pub time: String,
    /// Messages in the month.
    pub messages: usize,
}

/// Messages per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTimelinePoint {
    /// The day.
    pub date: NaiveDate,
    /// Messages on that day.
    pub messages: usize,
}

/// One bar of a category chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCount {
    /// Category, such as a weekday or a sender.
    pub label: String,
    /// Messages in the category.
    pub count: usize,
}

/// Weekday by hour-bucket message counts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeatMap {
    /// Weekday names, Monday first, only those with messages.
    pub rows: Vec<String>,
    /// Hour-bucket labels in hour order, only those with messages.
    pub columns: Vec<String>,
    /// `values[row][column]`, zero where no message fell.
    pub values: Vec<Vec<usize>>,
}

impl HeatMap {
    /// Count at `(weekday, bucket)`; zero for absent labels.
    pub fn get(&self, row: &str, column: &str) -> usize {
        let r = self.rows.iter().position(|l| l == row);
        let c = self.columns.iter().position(|l| l == column);
        match (r, c) {
            (Some(r), Some(c)) => self.values[r][c],
            _ => 0,
        }
    }

    /// Sum of all cells.
    pub fn total(&self) -> usize {
        self.values.iter().flatten().sum()
    }
}

/// A sender's share of all human messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserShare {
    /// Sender name.
    pub name: String,
    /// Percentage rounded to two decimals.
    pub percent: f64,
}

/// Busiest senders and every sender's share.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BusyUsers {
    /// Most active senders, busiest first.
    pub top: Vec<ActivityCount>,
    /// Every sender's share, largest first.
    pub shares: Vec<UserShare>,
}

/// A token and its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    /// Lowercased token.
    pub word: String,
    /// Occurrences.
    pub count: usize,
}

/// A placed word of a word cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCloudEntry {
    /// Lowercased token.
    pub word: String,
    /// Occurrences.
    pub count: usize,
    /// Frequency relative to the most frequent word, in `(0, 1]`.
    pub weight: f32,
    /// Font size interpolated from `weight`.
    pub font_size: f32,
}

/// Renderer-ready word cloud.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordCloud {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Canvas background color.
    pub background: String,
    /// Entries, most frequent first.
    pub words: Vec<WordCloudEntry>,
}

/// An emoji and its frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiCount {
    /// The emoji code point.
    pub emoji: String,
    /// Occurrences.
    pub count: usize,
}

/// A cleaned message paired with its heuristic label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRow {
    /// Message without emojis, links and digits.
    pub message: String,
    /// Heuristic label.
    pub sentiment: Sentiment,
}

/// Count keys, most frequent first; equal counts keep first-seen order.
fn value_counts<K, I>(items: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match index.get(&item) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    // stable: ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn to_activity(counts: Vec<(String, usize)>) -> Vec<ActivityCount> {
    counts
        .into_iter()
        .map(|(label, count)| ActivityCount { label, count })
        .collect()
}

/// Message, word, media and link counts.
pub fn fetch_stats(filter: &UserFilter, records: &[MessageRecord]) -> MessageStats {
    filter
        .apply(records)
        .fold(MessageStats::default(), |mut stats, record| {
            stats.messages += 1;
            if record.is_media() {
                stats.media += 1;
            } else {
                stats.words += nlp::word_count(&record.body);
            }
            stats.links += nlp::extract_urls(&record.body).len();
            stats
        })
}

/// Messages per month, ascending by `(year, month)`.
pub fn monthly_timeline(filter: &UserFilter, records: &[MessageRecord]) -> Vec<MonthlyTimelinePoint> {
    let mut groups: BTreeMap<(i32, u32), (String, usize)> = BTreeMap::new();
    for record in filter.apply(records) {
        groups
            .entry((record.year, record.month_num))
            .or_insert_with(|| (record.month.clone(), 0))
            .1 += 1;
    }
    groups
        .into_iter()
        .map(|((year, month_num), (month, messages))| MonthlyTimelinePoint {
            time: format!("{}-{}", month, year),
            year,
            month_num,
            month,
            messages,
        })
        .collect()
}

/// Messages per day, ascending by date.
pub fn daily_timeline(filter: &UserFilter, records: &[MessageRecord]) -> Vec<DailyTimelinePoint> {
    let mut groups: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for record in filter.apply(records) {
        *groups.entry(record.date).or_insert(0) += 1;
    }
    groups
        .into_iter()
        .map(|(date, messages)| DailyTimelinePoint { date, messages })
        .collect()
}

/// Messages per weekday name, busiest first.
pub fn week_activity_map(filter: &UserFilter, records: &[MessageRecord]) -> Vec<ActivityCount> {
    to_activity(value_counts(
        filter.apply(records).map(|r| r.day_name.clone()),
    ))
}

/// Messages per month name, busiest first.
pub fn month_activity_map(filter: &UserFilter, records: &[MessageRecord]) -> Vec<ActivityCount> {
    to_activity(value_counts(filter.apply(records).map(|r| r.month.clone())))
}

/// Weekday by hour-bucket pivot of message counts.
pub fn activity_heat_map(filter: &UserFilter, records: &[MessageRecord]) -> HeatMap {
    let mut cells: HashMap<(usize, u32), usize> = HashMap::new();
    let mut weekdays = [false; 7];
    let mut hours = [false; 24];

    for record in filter.apply(records) {
        let Some(day) = WEEKDAY_NAMES.iter().position(|d| *d == record.day_name) else {
            continue;
        };
        let hour = record.hour.min(23);
        weekdays[day] = true;
        hours[hour as usize] = true;
        *cells.entry((day, hour)).or_insert(0) += 1;
    }

    let row_days: Vec<usize> = (0..7).filter(|d| weekdays[*d]).collect();
    let col_hours: Vec<u32> = (0..24u32).filter(|h| hours[*h as usize]).collect();

    HeatMap {
        rows: row_days.iter().map(|d| WEEKDAY_NAMES[*d].to_string()).collect(),
        columns: col_hours.iter().map(|h| hour_bucket(*h)).collect(),
        values: row_days
            .iter()
            .map(|d| {
                col_hours
                    .iter()
                    .map(|h| cells.get(&(*d, *h)).copied().unwrap_or(0))
                    .collect()
            })
            .collect(),
    }
}

/// Top `top_n` senders and every sender's percentage of human messages.
pub fn most_busy_users(filter: &UserFilter, records: &[MessageRecord], top_n: usize) -> BusyUsers {
    let counts = value_counts(
        filter
            .apply(records)
            .filter(|r| !r.is_notification())
            .map(|r| r.sender.clone()),
    );
    let total: usize = counts.iter().map(|(_, c)| c).sum();

    let shares = counts
        .iter()
        .map(|(name, count)| UserShare {
            name: name.clone(),
            percent: round2(*count as f64 * 100.0 / total as f64),
        })
        .collect();
    let top = counts.into_iter().take(top_n).collect();

    BusyUsers {
        top: to_activity(top),
        shares,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lowercased tokens of human, non-media messages with stopwords removed.
fn content_tokens<'a>(
    filter: &'a UserFilter,
    records: &'a [MessageRecord],
    lexicon: &'a Lexicon,
    mode: StopwordMatch,
) -> impl Iterator<Item = String> + 'a {
    filter
        .apply(records)
        .filter(|r| !r.is_notification() && !r.is_media())
        .flat_map(|r| {
            r.body
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(move |token| !lexicon.is_stopword(token, mode))
}

/// The `top_n` most frequent non-stopword tokens.
pub fn most_common_words(
    filter: &UserFilter,
    records: &[MessageRecord],
    lexicon: &Lexicon,
    mode: StopwordMatch,
    top_n: usize,
) -> Vec<WordCount> {
    value_counts(content_tokens(filter, records, lexicon, mode))
        .into_iter()
        .take(top_n)
        .map(|(word, count)| WordCount { word, count })
        .collect()
}

/// Word frequencies scaled for rendering as a cloud.
pub fn create_wordcloud(
    filter: &UserFilter,
    records: &[MessageRecord],
    lexicon: &Lexicon,
    mode: StopwordMatch,
    config: &WordCloudConfig,
) -> WordCloud {
    let counts = value_counts(content_tokens(filter, records, lexicon, mode));
    let max_count = counts.first().map(|(_, c)| *c).unwrap_or(0);
    let span = config.max_font_size - config.min_font_size;

    let words = counts
        .into_iter()
        .take(config.max_words)
        .map(|(word, count)| {
            let weight = count as f32 / max_count as f32;
            WordCloudEntry {
                word,
                count,
                weight,
                font_size: config.min_font_size + span * weight,
            }
        })
        .collect();

    WordCloud {
        width: config.width,
        height: config.height,
        background: config.background.clone(),
        words,
    }
}

/// Every emoji used, most frequent first.
pub fn get_emojis(filter: &UserFilter, records: &[MessageRecord]) -> Vec<EmojiCount> {
    value_counts(filter.apply(records).flat_map(|r| nlp::emojis(&r.body)))
        .into_iter()
        .map(|(emoji, count)| EmojiCount {
            emoji: emoji.to_string(),
            count,
        })
        .collect()
}

/// Cleaned, heuristically labeled messages for classifier training.
///
/// Media placeholders are skipped; emojis, links and digits are removed
/// before labeling.
pub fn generate_training_data(
    filter: &UserFilter,
    records: &[MessageRecord],
    lexicon: &Lexicon,
) -> Vec<TrainingRow> {
    let labeler = LexiconLabeler::new(lexicon);
    filter
        .apply(records)
        .filter(|r| !r.is_media())
        .map(|r| {
            let message = nlp::clean_for_training(&r.body);
            let sentiment = labeler.classify(&message);
            TrainingRow { message, sentiment }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse;
    use chatpulse_core::constants::NOTIFICATION_SENDER;
    use chatpulse_core::ChatLog;

    const EXPORT: &str = "\
1/1/24, 10:00 - Messages and calls are end-to-end encrypted.
1/1/24, 10:00 - Alice: hello world 😂
1/1/24, 10:05 - Bob: <Media omitted>
1/1/24, 23:30 - Alice: good morning http://example.com 😂👍
2/1/24, 00:15 - Bob: hello again
6/2/24, 13:20 - Carol: bad news hello
";

    fn log() -> ChatLog {
        parse(EXPORT).expect("fixture parses")
    }

    fn lexicon() -> Lexicon {
        Lexicon::from_sources("good\n", "bad\n", "the\nis\nagain\n")
    }

    fn alice() -> UserFilter {
        UserFilter::from("Alice")
    }

    #[test]
    fn stats_example_from_two_line_export() {
        let log = parse("1/1/24, 10:00 - Alice: hello world\n1/1/24, 10:05 - Bob: <Media omitted>\n")
            .expect("export parses");
        let stats = fetch_stats(&UserFilter::from("Overall"), log.records());
        assert_eq!(stats.as_tuple(), (2, 2, 1, 0));
    }

    #[test]
    fn stats_count_words_media_links() {
        let log = log();
        let stats = fetch_stats(&UserFilter::Overall, log.records());
        assert_eq!(stats.messages, 6);
        assert_eq!(stats.media, 1);
        assert_eq!(stats.links, 1);
        assert_eq!(stats.words, 6 + 3 + 4 + 2 + 3);
    }

    #[test]
    fn links_without_scheme_are_counted() {
        let log = parse("1/1/24, 10:00 - Alice: see google.com and github.com/rust-lang\n").expect("export parses");
        let stats = fetch_stats(&UserFilter::Overall, log.records());
        assert_eq!(stats.links, 2);
        assert_eq!(stats.words, 4);
    }

    #[test]
    fn user_filter_never_exceeds_overall() {
        let log = log();
        let overall = fetch_stats(&UserFilter::Overall, log.records());
        let named = fetch_stats(&UserFilter::from("Overall"), log.records());
        assert_eq!(overall, named);
        for user in log.users() {
            let stats = fetch_stats(&UserFilter::User(user), log.records());
            assert!(stats.messages <= overall.messages);
        }
        assert_eq!(fetch_stats(&alice(), log.records()).messages, 2);
    }

    #[test]
    fn timelines_are_chronological() {
        let log = log();
        let monthly = monthly_timeline(&UserFilter::Overall, log.records());
        let labels: Vec<&str> = monthly.iter().map(|p| p.time.as_str()).collect();
        assert_eq!(labels, vec!["January-2024", "February-2024"]);
        assert_eq!(monthly[0].messages, 5);

        let daily = daily_timeline(&UserFilter::Overall, log.records());
        let counts: Vec<usize> = daily.iter().map(|p| p.messages).collect();
        assert_eq!(counts, vec![4, 1, 1]);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn activity_maps_sort_by_count() {
        let log = log();
        let week = week_activity_map(&UserFilter::Overall, log.records());
        assert_eq!(week[0], ActivityCount { label: "Monday".to_string(), count: 4 });
        assert_eq!(week.iter().map(|a| a.count).sum::<usize>(), 6);

        let months = month_activity_map(&UserFilter::Overall, log.records());
        assert_eq!(months[0].label, "January");
        assert_eq!(months[1], ActivityCount { label: "February".to_string(), count: 1 });
    }

    #[test]
    fn heat_map_fills_missing_cells_with_zero() {
        let log = log();
        let heat = activity_heat_map(&UserFilter::Overall, log.records());
        assert_eq!(heat.rows, vec!["Monday", "Tuesday"]);
        assert_eq!(heat.columns, vec!["00-1", "10-11", "13-14", "23-00"]);
        assert_eq!(heat.get("Monday", "10-11"), 3);
        assert_eq!(heat.get("Monday", "00-1"), 0);
        assert_eq!(heat.get("Tuesday", "00-1"), 1);
        assert_eq!(heat.get("Sunday", "10-11"), 0);
        assert_eq!(heat.total(), 6);
    }

    #[test]
    fn busy_users_exclude_notifications_and_sum_to_100() {
        let log = log();
        let busy = most_busy_users(&UserFilter::Overall, log.records(), 5);
        assert!(busy.top.iter().all(|a| a.label != NOTIFICATION_SENDER));
        assert_eq!(busy.top[0].label, "Alice");
        assert_eq!(busy.shares.len(), 3);
        let total: f64 = busy.shares.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() <= 0.01 * busy.shares.len() as f64);
        assert_eq!(busy.shares[2].percent, 20.0);
    }

    #[test]
    fn busy_users_top_is_truncated() {
        let log = log();
        let busy = most_busy_users(&UserFilter::Overall, log.records(), 1);
        assert_eq!(busy.top.len(), 1);
        assert_eq!(busy.shares.len(), 3);
    }

    #[test]
    fn common_words_skip_stopword_substrings() {
        let log = log();
        let lexicon = lexicon();
        let words = most_common_words(
            &UserFilter::Overall,
            log.records(),
            &lexicon,
            StopwordMatch::Substring,
            20,
        );
        assert_eq!(words[0], WordCount { word: "hello".to_string(), count: 3 });
        assert!(words.len() <= 20);
        assert!(words.windows(2).all(|w| w[0].count >= w[1].count));
        for word in &words {
            assert!(!"the\nis\nagain\n".contains(word.word.as_str()));
        }
        assert!(!words.iter().any(|w| w.word == "<media"));
        assert!(!words.iter().any(|w| w.word == "messages"));
    }

    #[test]
    fn exact_stopword_mode_keeps_substrings() {
        let log = log();
        let lexicon = Lexicon::from_sources("", "", "hello world\n");
        let substring = most_common_words(&UserFilter::Overall, log.records(), &lexicon, StopwordMatch::Substring, 20);
        let exact = most_common_words(&UserFilter::Overall, log.records(), &lexicon, StopwordMatch::Exact, 20);
        assert!(!substring.iter().any(|w| w.word == "hello"));
        assert_eq!(exact[0], WordCount { word: "hello".to_string(), count: 3 });
    }

    #[test]
    fn common_words_are_capped_at_top_n() {
        let log = log();
        let lexicon = Lexicon::default();
        let words = most_common_words(&UserFilter::Overall, log.records(), &lexicon, StopwordMatch::Exact, 2);
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn wordcloud_weights_are_relative_to_top_word() {
        let log = log();
        let lexicon = lexicon();
        let cloud = create_wordcloud(
            &UserFilter::Overall,
            log.records(),
            &lexicon,
            StopwordMatch::Substring,
            &WordCloudConfig::default(),
        );
        assert_eq!(cloud.width, 500);
        assert_eq!(cloud.words[0].word, "hello");
        assert_eq!(cloud.words[0].weight, 1.0);
        assert_eq!(cloud.words[0].font_size, 120.0);
        assert!(cloud.words.iter().all(|w| w.weight > 0.0 && w.weight <= 1.0));
    }

    #[test]
    fn emojis_are_counted_descending() {
        let log = log();
        let emojis = get_emojis(&UserFilter::Overall, log.records());
        assert_eq!(
            emojis,
            vec![
                EmojiCount { emoji: "😂".to_string(), count: 2 },
                EmojiCount { emoji: "👍".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn training_data_is_cleaned_and_labeled() {
        let log = log();
        let lexicon = lexicon();
        let rows = generate_training_data(&UserFilter::Overall, log.records(), &lexicon);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].message, "hello world ");
        assert_eq!(rows[2].message, "good morning  ");
        assert_eq!(rows[2].sentiment, Sentiment::Positive);
        assert_eq!(rows[4].sentiment, Sentiment::Negative);
        assert_eq!(rows[3].sentiment, Sentiment::Neutral);
    }

    #[test]
    fn unknown_user_yields_empty_aggregates() {
        let log = log();
        let lexicon = lexicon();
        let nobody = UserFilter::from("Nobody");
        let records = log.records();

        assert_eq!(fetch_stats(&nobody, records), MessageStats::default());
        assert!(monthly_timeline(&nobody, records).is_empty());
        assert!(daily_timeline(&nobody, records).is_empty());
        assert!(week_activity_map(&nobody, records).is_empty());
        assert!(month_activity_map(&nobody, records).is_empty());
        assert_eq!(activity_heat_map(&nobody, records), HeatMap::default());
        assert_eq!(most_busy_users(&nobody, records, 5), BusyUsers::default());
        assert!(most_common_words(&nobody, records, &lexicon, StopwordMatch::Substring, 20).is_empty());
        assert!(create_wordcloud(&nobody, records, &lexicon, StopwordMatch::Substring, &WordCloudConfig::default())
            .words
            .is_empty());
        assert!(get_emojis(&nobody, records).is_empty());
        assert!(generate_training_data(&nobody, records, &lexicon).is_empty());
    }
}
