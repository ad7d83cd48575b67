//! Session-spanning telemetry: code attempts and digit usage. Survives puzzle reset.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Attempts kept by a satellite.
pub const SATELLITE_HISTORY_CAPACITY: usize = 20;

/// Attempts mirrored by the coordinator per satellite.
pub const COORDINATOR_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHistoryEntry {
    pub code: String,
    pub correct: bool,
    pub entered_at: u64,
}

/// Bounded FIFO ring: the oldest attempt is evicted when full.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CodeHistory {
    entries: VecDeque<CodeHistoryEntry>,
    #[serde(skip)]
    capacity: usize,
}

impl CodeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: CodeHistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn contains(&self, code: &str, entered_at: u64) -> bool {
        self.entries
            .iter()
            .any(|e| e.code == code && e.entered_at == entered_at)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CodeHistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&CodeHistoryEntry> {
        self.entries.back()
    }
}

/// Per-digit usage counts, 0 through 9.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitFrequency([u32; 10]);

impl DigitFrequency {
    pub fn from_counts(counts: [u32; 10]) -> Self {
        DigitFrequency(counts)
    }

    /// Count every ASCII digit in `code`; other characters are skipped.
    pub fn record(&mut self, code: &str) {
        for d in code.chars().filter_map(|c| c.to_digit(10)) {
            self.0[d as usize] = self.0[d as usize].saturating_add(1);
        }
    }

    pub fn count(&self, digit: u8) -> u32 {
        self.0.get(digit as usize).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> [u32; 10] {
        self.0
    }
}
