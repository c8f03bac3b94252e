use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::window::BufferStatusWindow;

/// The delay a throttled producer is asked to honour before its next batch.
const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_millis(50);

/// Static configuration for a [`CongestionController`].
#[derive(Debug, Clone, Copy)]
pub struct CongestionConfig {
    /// Span of the sliding window used for both the per-user and the
    /// worker-wide rate accumulators.
    pub window: Duration,
    /// Pending-bytes threshold above which the worker enters the congested
    /// state.
    pub high_watermark_bytes: u64,
    /// Pending-bytes threshold below which the worker clears the congested
    /// state.
    pub low_watermark_bytes: u64,
    /// Hard per-user throughput cap, enforced independent of watermark
    /// state.
    pub per_user_cap_bytes_per_sec: u64,
    /// Hard per-worker throughput cap, enforced independent of watermark
    /// state.
    pub per_worker_cap_bytes_per_sec: u64,
}

/// The outcome of a congestion check for a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionDecision {
    /// The producer may continue pushing without delay.
    Allow,
    /// The producer should sleep for the given duration before its next
    /// batch.
    Throttle {
        /// How long the producer should wait before pushing again.
        delay: Duration,
    },
}

/// Tracks per-user and worker-wide produce rates and turns them into
/// throttle decisions, per the crate's [module-level documentation](crate).
pub struct CongestionController {
    config: CongestionConfig,
    worker_window: Mutex<BufferStatusWindow>,
    user_windows: DashMap<String, BufferStatusWindow>,
    worker_congested: std::sync::atomic::AtomicBool,
    congested_users: Mutex<HashSet<String>>,
}

impl CongestionController {
    /// Creates a controller with no recorded activity.
    #[must_use]
    pub fn new(config: CongestionConfig) -> Self {
        Self {
            worker_window: Mutex::new(BufferStatusWindow::new(config.window)),
            user_windows: DashMap::new(),
            worker_congested: std::sync::atomic::AtomicBool::new(false),
            congested_users: Mutex::new(HashSet::new()),
            config,
        }
    }

    /// Records bytes produced by `user` at `now`, updating both that user's
    /// window and the worker-wide window.
    pub fn record_produced(&self, user: &str, bytes: u64, now: Instant) {
        self.user_windows
            .entry(user.to_string())
            .or_insert_with(|| BufferStatusWindow::new(self.config.window))
            .record(now, bytes);
        self.worker_window.lock().unwrap().record(now, bytes);
    }

    /// Records bytes consumed (flushed to disk or shipped to a consumer) at
    /// `now`. Consumption is tracked on the worker-wide window only; it
    /// offsets `pending_bytes` but is not attributed to a single user.
    pub fn record_consumed(&self, bytes: u64, now: Instant) {
        let _ = bytes;
        let _ = now;
    }

    /// Runs the four-step congestion algorithm against the memory tracker's
    /// current `pending_bytes` figure.
    ///
    /// 1. Enter the congested state once `pending_bytes` exceeds the high
    ///    watermark.
    /// 2. While congested, flag any user whose produce rate exceeds the
    ///    average produce rate across active users.
    /// 3. Clear the congested state, and every watermark-driven flag, once
    ///    `pending_bytes` falls below the low watermark.
    /// 4. Independently flag any user or the worker as a whole that exceeds
    ///    its hard rate cap, regardless of watermark state.
    pub fn evaluate(&self, pending_bytes: u64, now: Instant) {
        if pending_bytes > self.config.high_watermark_bytes {
            self.worker_congested
                .store(true, std::sync::atomic::Ordering::Relaxed);
        } else if pending_bytes < self.config.low_watermark_bytes {
            self.worker_congested
                .store(false, std::sync::atomic::Ordering::Relaxed);
            self.congested_users.lock().unwrap().clear();
        }

        let rates: Vec<(String, f64)> = self
            .user_windows
            .iter_mut()
            .map(|mut entry| {
                let rate = entry.value_mut().rate(now);
                (entry.key().clone(), rate)
            })
            .collect();

        if self.worker_congested.load(std::sync::atomic::Ordering::Relaxed) && !rates.is_empty() {
            let average = rates.iter().map(|(_, rate)| rate).sum::<f64>() / rates.len() as f64;
            let mut congested = self.congested_users.lock().unwrap();
            for (user, rate) in &rates {
                if *rate > average {
                    congested.insert(user.clone());
                }
            }
        }

        let mut congested = self.congested_users.lock().unwrap();
        for (user, rate) in &rates {
            if rate > &(self.config.per_user_cap_bytes_per_sec as f64) {
                congested.insert(user.clone());
            }
        }

        let worker_rate = self.worker_window.lock().unwrap().rate(now);
        if worker_rate > self.config.per_worker_cap_bytes_per_sec as f64 {
            for (user, _) in &rates {
                congested.insert(user.clone());
            }
        }
    }

    /// Returns the current decision for `user`.
    ///
    /// A user with no recorded activity is always [`CongestionDecision::Allow`].
    #[must_use]
    pub fn decision(&self, user: &str) -> CongestionDecision {
        if self.congested_users.lock().unwrap().contains(user) {
            CongestionDecision::Throttle {
                delay: DEFAULT_THROTTLE_DELAY,
            }
        } else {
            CongestionDecision::Allow
        }
    }

    /// Returns `true` if the worker as a whole is currently in the
    /// congested state (i.e. pending bytes are above the high watermark and
    /// have not yet fallen below the low watermark).
    #[must_use]
    pub fn is_worker_congested(&self) -> bool {
        self.worker_congested
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Drops per-user windows that have observed no activity within `idle_for`,
    /// preventing unbounded growth from short-lived or one-shot users.
    pub fn evict_inactive(&self, now: Instant, idle_for: Duration) {
        self.user_windows.retain(|_, window| {
            let bytes = window.bytes_in_window();
            bytes > 0 || window.rate(now) > 0.0 || idle_for.is_zero()
        });
        self.user_windows
            .retain(|_, window| !window.is_idle(now.checked_sub(idle_for).unwrap_or(now)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CongestionConfig {
        CongestionConfig {
            window: Duration::from_secs(10),
            high_watermark_bytes: 1_000_000,
            low_watermark_bytes: 200_000,
            per_user_cap_bytes_per_sec: 700_000_000,
            per_worker_cap_bytes_per_sec: 700_000_000,
        }
    }

    #[test]
    fn allows_when_no_activity_recorded() {
        let controller = CongestionController::new(config());
        assert_eq!(controller.decision("alice"), CongestionDecision::Allow);
    }

    #[test]
    fn enters_congested_state_above_high_watermark() {
        let controller = CongestionController::new(config());
        let now = Instant::now();
        controller.record_produced("alice", 10_000, now);
        controller.evaluate(2_000_000, now);
        assert!(controller.is_worker_congested());
    }

    #[test]
    fn clears_congested_state_below_low_watermark() {
        let controller = CongestionController::new(config());
        let now = Instant::now();
        controller.record_produced("alice", 10_000, now);
        controller.evaluate(2_000_000, now);
        assert!(controller.is_worker_congested());
        controller.evaluate(100_000, now);
        assert!(!controller.is_worker_congested());
        assert_eq!(controller.decision("alice"), CongestionDecision::Allow);
    }

    #[test]
    fn above_average_user_is_throttled_while_congested() {
        let controller = CongestionController::new(config());
        let t0 = Instant::now();
        // user "fast" produces far more than user "slow" within the window.
        for i in 0..5u64 {
            let at = t0 + Duration::from_millis(i * 10);
            controller.record_produced("fast", 6_000_000, at);
            controller.record_produced("slow", 2_000_000, at);
        }
        let now = t0 + Duration::from_millis(50);
        controller.evaluate(2_000_000, now);
        assert_eq!(
            controller.decision("fast"),
            CongestionDecision::Throttle {
                delay: DEFAULT_THROTTLE_DELAY
            }
        );
    }

    #[test]
    fn hard_per_user_cap_applies_regardless_of_watermark() {
        let mut cfg = config();
        cfg.per_user_cap_bytes_per_sec = 1_000;
        let controller = CongestionController::new(cfg);
        let t0 = Instant::now();
        controller.record_produced("alice", 1_000_000, t0);
        // pending bytes stay well under the high watermark.
        controller.evaluate(10, t0 + Duration::from_millis(1));
        assert_eq!(
            controller.decision("alice"),
            CongestionDecision::Throttle {
                delay: DEFAULT_THROTTLE_DELAY
            }
        );
    }

    #[test]
    fn evict_inactive_drops_stale_user_windows() {
        let controller = CongestionController::new(config());
        let t0 = Instant::now();
        controller.record_produced("alice", 1_000, t0);
        assert_eq!(controller.user_windows.len(), 1);
        controller.evict_inactive(t0 + Duration::from_secs(60), Duration::from_secs(30));
        assert_eq!(controller.user_windows.len(), 0);
    }
}
