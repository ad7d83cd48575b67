//! Noisy physical inputs: key debounce, contact edge detection, tag identifiers.

use serde::{Deserialize, Serialize};

/// Suppresses a repeat of the same key inside the window. A different key is
/// accepted immediately.
#[derive(Debug, Clone)]
pub struct KeyDebouncer {
    window_ms: u64,
    last: Option<(char, u64)>,
}

impl KeyDebouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last: None,
        }
    }

    pub fn accept(&mut self, key: char, now_ms: u64) -> bool {
        if let Some((last_key, at)) = self.last {
            if last_key == key && now_ms.saturating_sub(at) <= self.window_ms {
                return false;
            }
        }
        self.last = Some((key, now_ms));
        true
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

/// Instantaneous level of a binary contact sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactLevel {
    #[default]
    Open,
    Closed,
}

/// Open → closed edge detector with an arming delay and a sample debounce.
///
/// Samples closer than `debounce_ms` to the previous accepted sample are dropped.
/// During the arming window samples only establish the baseline level, so a
/// contact that is already closed when arming ends must open before it can fire.
#[derive(Debug, Clone)]
pub struct ContactEdgeDetector {
    debounce_ms: u64,
    arming_ms: u64,
    armed_at: u64,
    last_sample_at: Option<u64>,
    level: Option<ContactLevel>,
}

impl ContactEdgeDetector {
    pub fn new(debounce_ms: u64, arming_ms: u64) -> Self {
        Self {
            debounce_ms,
            arming_ms,
            armed_at: 0,
            last_sample_at: None,
            level: None,
        }
    }

    /// Restart the arming window and forget the baseline.
    pub fn arm(&mut self, now_ms: u64) {
        self.armed_at = now_ms;
        self.last_sample_at = None;
        self.level = None;
    }

    /// Feed one sample. Returns true on an accepted open → closed transition.
    pub fn sample(&mut self, level: ContactLevel, now_ms: u64) -> bool {
        if let Some(at) = self.last_sample_at {
            if now_ms.saturating_sub(at) < self.debounce_ms {
                return false;
            }
        }
        self.last_sample_at = Some(now_ms);
        let previous = self.level.replace(level);
        if now_ms.saturating_sub(self.armed_at) < self.arming_ms {
            return false;
        }
        previous == Some(ContactLevel::Open) && level == ContactLevel::Closed
    }
}

/// Tag UID as the reader firmware prints it: each byte in upper-case hex, no padding.
/// `[0xF1, 0xAA, 0xF7, 0x03]` becomes `"F1AAF73"`.
pub fn tag_uid_hex(uid: &[u8]) -> String {
    uid.iter().map(|b| format!("{:X}", b)).collect()
}

/// Case-insensitive match of a read tag against the accepted identifiers.
pub fn tag_matches(read: &str, accepted: &[String]) -> bool {
    let read = read.trim();
    !read.is_empty() && accepted.iter().any(|a| a.trim().eq_ignore_ascii_case(read))
}
