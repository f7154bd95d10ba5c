//! Wire format of tier-2 entries.

use serde::{Deserialize, Serialize};

/// A cached value plus freshness metadata, stored as JSON.
///
/// Timestamps are milliseconds since the Unix epoch; `ttl` is seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: T,
    pub timestamp: i64,
    pub ttl: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl<T> Envelope<T> {
    /// Wraps `data` written at `timestamp_ms`.
    ///
    /// `stale_window` of 0 disables staleness tracking; a window longer than
    /// `ttl` makes the entry stale immediately.
    pub fn new(data: T, timestamp_ms: i64, ttl: u64, stale_window: u64) -> Self {
        let stale_at = (stale_window > 0).then(|| {
            let fresh_secs = ttl.saturating_sub(stale_window);
            timestamp_ms.saturating_add(secs_to_ms(fresh_secs))
        });

        Self {
            data,
            timestamp: timestamp_ms,
            ttl,
            stale_at,
            tags: Vec::new(),
            version: None,
        }
    }

    /// Wraps `data` written now.
    pub fn now(data: T, ttl: u64, stale_window: u64) -> Self {
        Self::new(data, now_millis(), ttl, stale_window)
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Instant (ms) after which the store drops the entry.
    pub fn expires_at(&self) -> i64 {
        self.timestamp.saturating_add(secs_to_ms(self.ttl))
    }

    /// Returns `true` once `now_ms` reaches `stale_at`.
    pub fn is_stale_at(&self, now_ms: i64) -> bool {
        self.stale_at.is_some_and(|stale_at| now_ms >= stale_at)
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(now_millis())
    }

    /// Milliseconds since the entry was written (0 if the clock went backwards).
    pub fn age_at(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp).max(0)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[inline]
fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
}

/// Wall-clock milliseconds since the Unix epoch.
#[inline]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
