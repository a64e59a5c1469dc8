use crate::constants::{MEDIA_PLACEHOLDER, NOTIFICATION_SENDER, OVERALL};
use crate::Error;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// English month names, indexed by `month_num - 1`.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// English weekday names, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// One parsed chat message with its derived calendar fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Date and time of the message.
    pub timestamp: NaiveDateTime,

    /// Author, or [`NOTIFICATION_SENDER`] for system lines.
    pub sender: String,

    /// Message text.
    pub body: String,

    /// Date part of the timestamp.
    pub date: NaiveDate,

    /// Calendar year.
    pub year: i32,

    /// Month number, 1 to 12.
    pub month_num: u32,

    /// English month name.
    pub month: String,

    /// Day of month.
    pub day: u32,

    /// Hour, 0 to 23.
    pub hour: u32,

    /// Minute, 0 to 59.
    pub minute: u32,

    /// English weekday name.
    pub day_name: String,

    /// Hour bucket label, see [`hour_bucket`].
    pub period: String,
}

impl MessageRecord {
    /// Build a record and derive every calendar field from `timestamp`.
    pub fn new(timestamp: NaiveDateTime, sender: impl Into<String>, body: impl Into<String>) -> Self {
        let hour = timestamp.hour();
        Self {
            timestamp,
            sender: sender.into(),
            body: body.into(),
            date: timestamp.date(),
            year: timestamp.year(),
            month_num: timestamp.month(),
            month: month_name(timestamp.month()).to_string(),
            day: timestamp.day(),
            hour,
            minute: timestamp.minute(),
            day_name: weekday_name(timestamp.weekday()).to_string(),
            period: hour_bucket(hour),
        }
    }

    /// Whether this is a system line without a human author.
    pub fn is_notification(&self) -> bool {
        self.sender == NOTIFICATION_SENDER
    }

    /// Whether the body is the media placeholder.
    pub fn is_media(&self) -> bool {
        self.body == MEDIA_PLACEHOLDER
    }
}

/// Label of the one-hour window containing `hour`.
///
/// `23` maps to `"23-00"` and `0` to `"00-1"`; every other hour `h` maps
/// to `"h-(h+1)"` without zero padding.
pub fn hour_bucket(hour: u32) -> String {
    match hour {
        23 => "23-00".to_string(),
        0 => "00-1".to_string(),
        h => format!("{}-{}", h, h + 1),
    }
}

/// English name of a month number (1-based). Out-of-range values clamp.
pub fn month_name(month_num: u32) -> &'static str {
    let idx = month_num.clamp(1, 12) as usize - 1;
    MONTH_NAMES[idx]
}

/// English name of a weekday.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_NAMES[weekday.num_days_from_monday() as usize]
}

/// Process-unique identity of one parsed record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordSetId(u64);

static NEXT_RECORD_SET_ID: AtomicU64 = AtomicU64::new(1);

impl RecordSetId {
    /// Allocate a fresh identity.
    pub fn next() -> Self {
        Self(NEXT_RECORD_SET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RecordSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "records#{}", self.0)
    }
}

/// An immutable, cheaply clonable set of parsed records.
#[derive(Debug, Clone)]
pub struct ChatLog {
    id: RecordSetId,
    format: String,
    records: Arc<Vec<MessageRecord>>,
}

impl ChatLog {
    /// Wrap records produced by a parser under a fresh identity.
    pub fn new(format: impl Into<String>, records: Vec<MessageRecord>) -> Self {
        Self {
            id: RecordSetId::next(),
            format: format.into(),
            records: Arc::new(records),
        }
    }

    /// Identity used as cache key.
    pub fn id(&self) -> RecordSetId {
        self.id
    }

    /// Name of the export format the parser matched.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// All records in export order.
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct human senders, sorted.
    pub fn users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .records
            .iter()
            .filter(|r| !r.is_notification())
            .map(|r| r.sender.clone())
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Choices offered to a user picker: `"Overall"` then every sender.
    pub fn user_choices(&self) -> Vec<String> {
        let mut choices = vec![OVERALL.to_string()];
        choices.extend(self.users());
        choices
    }

    /// Records accepted by `filter`, in export order.
    pub fn filtered<'a>(&'a self, filter: &'a UserFilter) -> impl Iterator<Item = &'a MessageRecord> + 'a {
        self.records.iter().filter(move |r| filter.matches(r))
    }
}

/// Restricts aggregates to one sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum UserFilter {
    /// No restriction.
    #[default]
    Overall,

    /// Only messages sent by this user.
    User(String),
}

impl UserFilter {
    /// Whether `record` passes the filter.
    pub fn matches(&self, record: &MessageRecord) -> bool {
        match self {
            Self::Overall => true,
            Self::User(name) => record.sender == *name,
        }
    }

    /// Apply the filter to a slice.
    pub fn apply<'a>(&'a self, records: &'a [MessageRecord]) -> impl Iterator<Item = &'a MessageRecord> + 'a {
        records.iter().filter(move |r| self.matches(r))
    }

    /// Whether this is the no-filter value.
    pub fn is_overall(&self) -> bool {
        matches!(self, Self::Overall)
    }
}

impl From<&str> for UserFilter {
    fn from(value: &str) -> Self {
        if value == OVERALL {
            Self::Overall
        } else {
            Self::User(value.to_string())
        }
    }
}

impl From<Option<&str>> for UserFilter {
    fn from(value: Option<&str>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl fmt::Display for UserFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overall => f.write_str(OVERALL),
            Self::User(name) => f.write_str(name),
        }
    }
}

impl Serialize for UserFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UserFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Three-way sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// More negative than positive evidence.
    Negative,

    /// Balanced or no evidence.
    Neutral,

    /// More positive than negative evidence.
    Positive,
}

impl Sentiment {
    /// Every label, in class-index order.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    /// Position in [`Sentiment::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Negative => 0,
            Self::Neutral => 1,
            Self::Positive => 2,
        }
    }

    /// Inverse of [`Sentiment::index`].
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }

    /// Label implied by comparing positive and negative evidence.
    /// Ties are neutral.
    pub fn from_counts(positive: usize, negative: usize) -> Self {
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Self::Positive,
            std::cmp::Ordering::Less => Self::Negative,
            std::cmp::Ordering::Equal => Self::Neutral,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "positive" => Ok(Self::Positive),
            other => Err(Error::Parse(format!("unknown sentiment label '{}'", other))),
        }
    }
}
