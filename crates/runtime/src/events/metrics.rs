//! Per-event dispatch metrics.
//!
//! Tracks handler invocation counts, failures and durations per event name.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::sync::lock;

/// Raw accumulator for one event name.
#[derive(Debug, Default, Clone)]
struct MetricsRecord {
    count: u64,
    error_count: u64,
    total_duration: Duration,
    max_duration: Duration,
    samples: VecDeque<Duration>,
}

/// Handler metrics tracked by the event bus, keyed by event name.
#[derive(Debug)]
pub struct EventMetrics {
    window: usize,
    records: Mutex<HashMap<String, MetricsRecord>>,
}

impl EventMetrics {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Records one handler invocation.
    pub(crate) fn record(&self, event: &str, duration: Duration, failed: bool) {
        let mut records = lock(&self.records);
        let record = records.entry(event.to_string()).or_default();

        record.count += 1;
        if failed {
            record.error_count += 1;
        }
        record.total_duration += duration;
        record.max_duration = record.max_duration.max(duration);

        if record.samples.len() == self.window {
            record.samples.pop_front();
        }
        record.samples.push_back(duration);
    }

    /// Returns stats for a single event name.
    pub fn event(&self, event: &str) -> Option<EventStats> {
        lock(&self.records).get(event).map(EventStats::from)
    }

    /// Creates a snapshot of all metrics for display/logging.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let records = lock(&self.records);
        MetricsSnapshot {
            events: records
                .iter()
                .map(|(name, record)| (name.clone(), EventStats::from(record)))
                .collect(),
        }
    }
}

/// Point-in-time stats for one event name.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStats {
    pub count: u64,
    pub error_count: u64,
    pub avg_duration: Duration,
    pub max_duration: Duration,
    /// Most recent handler durations, oldest first.
    pub recent: Vec<Duration>,
}

impl EventStats {
    /// Returns error rate as a fraction (0-1).
    pub fn error_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.count as f64
        }
    }
}

impl From<&MetricsRecord> for EventStats {
    fn from(record: &MetricsRecord) -> Self {
        let avg_duration = if record.count == 0 {
            Duration::ZERO
        } else {
            let nanos = record.total_duration.as_nanos() / u128::from(record.count);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };
        Self {
            count: record.count,
            error_count: record.error_count,
            avg_duration,
            max_duration: record.max_duration,
            recent: record.samples.iter().copied().collect(),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub events: BTreeMap<String, EventStats>,
}

impl MetricsSnapshot {
    pub fn total_invocations(&self) -> u64 {
        self.events.values().map(|stats| stats.count).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.events.values().map(|stats| stats.error_count).sum()
    }
}
