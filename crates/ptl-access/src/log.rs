//! Bounded in-memory log of processed scans.

use chrono::Utc;
use ptl_core::constants::ACCESS_LOG_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One processed scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unix time in seconds.
    #[serde(rename = "t")]
    pub timestamp: i64,
    pub pin: String,
    pub code: String,
}

/// Ring of the most recent scans; the oldest entry is dropped when full.
///
/// Holds at most `capacity` entries.
///
/// # Examples
///
/// ```
/// use ptl_access::AccessLog;
///
/// let mut log = AccessLog::with_capacity(2);
/// log.push_at(1, "A1", "100");
/// log.push_at(2, "A2", "200");
/// log.push_at(3, "A3", "300");
///
/// let pins: Vec<_> = log.entries().map(|e| e.pin.as_str()).collect();
/// assert_eq!(pins, ["A2", "A3"]);
/// ```
#[derive(Debug, Clone)]
pub struct AccessLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl AccessLog {
    pub fn new() -> Self {
        Self::with_capacity(ACCESS_LOG_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a scan at the current time.
    pub fn push(&mut self, pin: impl Into<String>, code: impl Into<String>) {
        self.push_at(Utc::now().timestamp(), pin, code);
    }

    pub fn push_at(&mut self, timestamp: i64, pin: impl Into<String>, code: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp,
            pin: pin.into(),
            code: code.into(),
        });
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut log = AccessLog::new();
        for i in 0..(ACCESS_LOG_CAPACITY as i64 + 1) {
            log.push_at(i, "A1", i.to_string());
        }

        assert_eq!(log.len(), ACCESS_LOG_CAPACITY);
        assert_eq!(log.entries().next().unwrap().timestamp, 1);
        assert_eq!(
            log.entries().last().unwrap().timestamp,
            ACCESS_LOG_CAPACITY as i64
        );
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut log = AccessLog::with_capacity(0);
        log.push("A1", "1");
        log.push("A2", "2");
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.entries().next().unwrap().code, "2");
    }

    #[test]
    fn test_entry_serializes_with_short_time_key() {
        let entry = LogEntry {
            timestamp: 42,
            pin: "A1".into(),
            code: "100".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["t"], 42);
    }
}
