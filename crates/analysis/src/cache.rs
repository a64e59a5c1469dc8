//! Memoized aggregates keyed by what was computed, for whom, over which
//! record set.

use chatpulse_core::{RecordSetId, UserFilter};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// The aggregate a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Message, word, media and link counts.
    Stats,
    /// Messages per calendar month.
    MonthlyTimeline,
    /// Messages per day.
    DailyTimeline,
    /// Messages per weekday.
    WeekActivity,
    /// Messages per month name.
    MonthActivity,
    /// Weekday by hour-bucket counts.
    HeatMap,
    /// Top senders and their shares.
    BusyUsers,
    /// Most frequent non-stopwords.
    CommonWords,
    /// Weighted words for rendering.
    WordCloud,
    /// Emoji frequencies.
    Emojis,
    /// Labeled training rows.
    TrainingData,
    /// Classifier scores.
    TrainingSummary,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stats => "stats",
            Self::MonthlyTimeline => "monthly_timeline",
            Self::DailyTimeline => "daily_timeline",
            Self::WeekActivity => "week_activity",
            Self::MonthActivity => "month_activity",
            Self::HeatMap => "heat_map",
            Self::BusyUsers => "busy_users",
            Self::CommonWords => "common_words",
            Self::WordCloud => "word_cloud",
            Self::Emojis => "emojis",
            Self::TrainingData => "training_data",
            Self::TrainingSummary => "training_summary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: AggregateKind,
    filter: UserFilter,
    record_set: RecordSetId,
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Thread-safe aggregate cache.
///
/// Values of any `Clone + Send + Sync + 'static` type can be stored; each
/// key holds one type, and a lookup with a different type is a miss that
/// overwrites the entry.
#[derive(Default)]
pub struct AggregateCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AggregateCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        // Entries are only inserted or removed whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached value for the key, or the result of `compute` stored under it.
    pub fn get_or_compute<T, F>(
        &self,
        kind: AggregateKind,
        filter: &UserFilter,
        record_set: RecordSetId,
        compute: F,
    ) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        match self.try_get_or_compute(kind, filter, record_set, || {
            Ok::<T, std::convert::Infallible>(compute())
        }) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`AggregateCache::get_or_compute`]; errors are returned and not cached.
    pub fn try_get_or_compute<T, E, F>(
        &self,
        kind: AggregateKind,
        filter: &UserFilter,
        record_set: RecordSetId,
        compute: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let key = CacheKey {
            kind,
            filter: filter.clone(),
            record_set,
        };

        let cached = self.entries().get(&key).cloned();
        if let Some(value) = cached.and_then(|entry| entry.downcast_ref::<T>().cloned()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("cache hit: {} for {} on {}", kind, filter, record_set);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("cache miss: {} for {} on {}", kind, filter, record_set);
        // Computed without the lock held; a concurrent miss computes the same value.
        let value = compute()?;
        self.entries().insert(key, Arc::new(value.clone()));
        Ok(value)
    }

    /// Drop every entry computed over `record_set`.
    pub fn invalidate(&self, record_set: RecordSetId) {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| key.record_set != record_set);
        debug!(
            "invalidated {} cache entries for {}",
            before - entries.len(),
            record_set
        );
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that had to compute.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for AggregateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateCache")
            .field("entries", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
