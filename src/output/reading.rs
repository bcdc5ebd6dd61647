use chrono::{DateTime, Utc};
use std::fmt;

/// One extracted occupancy value and the time it was captured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Displayed occupancy
    pub value: u32,

    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

impl Reading {
    pub fn new(value: u32, timestamp: f64) -> Self {
        Self { value, timestamp }
    }

    /// Creates a reading stamped with the current wall-clock time
    pub fn now(value: u32) -> Self {
        Self::at(value, Utc::now())
    }

    /// Creates a reading stamped with `time`, at microsecond precision
    pub fn at(value: u32, time: DateTime<Utc>) -> Self {
        Self::new(value, time.timestamp_micros() as f64 / 1_000_000.0)
    }

    /// Formats the reading as a log line, newline included
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for Reading {
    /// `value,timestamp`; the timestamp always shows a fractional part
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{:?}", self.value, self.timestamp)
    }
}
