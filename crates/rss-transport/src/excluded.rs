//! The fetch-excluded set: endpoints recently observed failing, skipped by
//! new connection attempts until they age out.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Tracks endpoints a timeout or connection failure has recently excluded
/// from new pushes or fetches.
///
/// An endpoint stays excluded for `ttl` after its most recent failure; a
/// fresh failure refreshes the timer rather than stacking exclusions.
pub struct ExcludedEndpoints {
    ttl: Duration,
    excluded: DashMap<String, Instant>,
}

impl ExcludedEndpoints {
    /// Creates a tracker that excludes a failing endpoint for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            excluded: DashMap::new(),
        }
    }

    /// Records a failure against `endpoint`, starting or refreshing its
    /// exclusion window.
    pub fn mark_failed(&self, endpoint: &str, now: Instant) {
        self.excluded.insert(endpoint.to_string(), now);
    }

    /// Clears an endpoint's exclusion, typically after a successful
    /// connection.
    pub fn clear(&self, endpoint: &str) {
        self.excluded.remove(endpoint);
    }

    /// Returns `true` if `endpoint` is currently excluded.
    #[must_use]
    pub fn is_excluded(&self, endpoint: &str, now: Instant) -> bool {
        self.excluded
            .get(endpoint)
            .is_some_and(|marked_at| now.duration_since(*marked_at) < self.ttl)
    }

    /// Drops exclusions whose window has elapsed as of `now`.
    pub fn evict_expired(&self, now: Instant) {
        self.excluded
            .retain(|_, marked_at| now.duration_since(*marked_at) < self.ttl);
    }
}
