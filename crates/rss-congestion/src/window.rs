use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A sliding-window accumulator of bytes produced or consumed, used to
/// compute a trailing bytes-per-second rate.
///
/// One window is kept per active user and one for the worker as a whole; see
/// the [crate-level documentation](crate) for how [`CongestionController`]
/// composes them.
///
/// [`CongestionController`]: crate::CongestionController
#[derive(Debug, Clone)]
pub struct BufferStatusWindow {
    window: Duration,
    samples: VecDeque<(Instant, u64)>,
    total_bytes: u64,
}

impl BufferStatusWindow {
    /// Creates an empty window spanning the given duration.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
            total_bytes: 0,
        }
    }

    /// Records `bytes` observed at `now`, evicting samples that have aged out
    /// of the window.
    pub fn record(&mut self, now: Instant, bytes: u64) {
        self.evict_before(now);
        self.samples.push_back((now, bytes));
        self.total_bytes += bytes;
    }

    fn evict_before(&mut self, now: Instant) {
        while let Some(&(sampled_at, bytes)) = self.samples.front() {
            if now.saturating_duration_since(sampled_at) > self.window {
                self.samples.pop_front();
                self.total_bytes -= bytes;
            } else {
                break;
            }
        }
    }

    /// Returns the trailing bytes-per-second rate as of `now`.
    ///
    /// The denominator is the lesser of the configured window and the span
    /// actually covered by recorded samples, so a window that has only been
    /// open for one second does not understate a burst as a ten-second
    /// average.
    #[must_use]
    pub fn rate(&mut self, now: Instant) -> f64 {
        self.evict_before(now);
        if self.samples.is_empty() {
            return 0.0;
        }
        let oldest = self.samples.front().map_or(now, |&(at, _)| at);
        let span = now.saturating_duration_since(oldest).max(Duration::from_millis(1));
        let span = span.min(self.window);
        self.total_bytes as f64 / span.as_secs_f64()
    }

    /// Returns the total number of bytes currently retained in the window.
    #[must_use]
    pub fn bytes_in_window(&self) -> u64 {
        self.total_bytes
    }

    /// Returns `true` once no sample has landed within the window as of `now`.
    #[must_use]
    pub fn is_idle(&mut self, now: Instant) -> bool {
        self.evict_before(now);
        self.samples.is_empty()
    }
}
