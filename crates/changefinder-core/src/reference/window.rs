use chrono::{DateTime, Duration, Utc};

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `[start, end)`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[start, end]`, expressed as a half-open window one nanosecond wider
    pub fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start, end + Duration::nanoseconds(1))
    }

    /// From a predecessor's `valid_from` up to and including the current one
    pub fn between(predecessor: DateTime<Utc>, current: DateTime<Utc>) -> Self {
        Self::closed(predecessor, current)
    }

    /// The `lookback` leading up to and including `at`
    pub fn lookback(at: DateTime<Utc>, lookback: Duration) -> Self {
        Self::closed(at - lookback, at)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}
