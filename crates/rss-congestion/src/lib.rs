#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

//! # Overview
//!
//! `rss_congestion` implements the worker's back-pressure signalling: a
//! sliding-window rate accumulator per user and per worker
//! ([`BufferStatusWindow`]), a [`CongestionController`] that turns those rates
//! plus the memory tracker's pending-bytes figure into per-user throttle
//! decisions, and a [`BandwidthLimiter`] token bucket that enforces the hard
//! per-user and per-worker rate caps independent of watermark state.
//!
//! # Design
//!
//! - [`BufferStatusWindow`] is a ring-buffer accumulator of `(Instant, bytes)`
//!   samples over a configurable window (10 seconds by default) used to
//!   compute a trailing bytes-per-second rate.
//! - [`CongestionController`] keeps one [`BufferStatusWindow`] per active user
//!   plus one worker-wide window, and runs the four-step decision algorithm
//!   on every `evaluate` call: enter congestion once pending bytes cross the
//!   high watermark, flag above-average users as congested, clear once
//!   pending bytes fall below the low watermark, and independently enforce
//!   hard per-user/per-worker caps regardless of watermark state.
//! - [`BandwidthLimiter`] implements the token-bucket pacing primitive the
//!   controller uses to turn "this user is over its hard cap" into a concrete
//!   sleep duration for the producer to honour.
//!
//! # Invariants
//!
//! - [`BufferStatusWindow::rate`] never panics on an empty window; it returns
//!   zero.
//! - The limiter never sleeps for intervals shorter than 100ms, avoiding
//!   excessive context switches on bursty producers.
//! - When the optional `test-support` feature is enabled, sleep requests are
//!   recorded instead of reaching `std::thread::sleep`, keeping unit tests
//!   deterministic and fast.
//! - [`CongestionController::evaluate`] is idempotent between producer
//!   updates: calling it twice with the same pending-bytes figure and no new
//!   samples yields the same congestion state.
//!
//! # Examples
//!
//! ```
//! use rss_congestion::{CongestionConfig, CongestionController, CongestionDecision};
//! use std::time::{Duration, Instant};
//!
//! let config = CongestionConfig {
//!     window: Duration::from_secs(10),
//!     high_watermark_bytes: 1_000_000,
//!     low_watermark_bytes: 200_000,
//!     per_user_cap_bytes_per_sec: 100_000_000,
//!     per_worker_cap_bytes_per_sec: 1_000_000_000,
//! };
//! let controller = CongestionController::new(config);
//! let now = Instant::now();
//! controller.record_produced("tenant-a/alice", 10_000, now);
//! controller.evaluate(500_000, now);
//! assert_eq!(controller.decision("tenant-a/alice"), CongestionDecision::Allow);
//! ```
//!
//! # See also
//!
//! - `rss-worker` for the push handler that calls [`CongestionController`]
//!   before accepting each batch.
//! - `rss-memory` for the memory tracker whose `pending_bytes()` feeds
//!   [`CongestionController::evaluate`].

mod controller;
mod limiter;
mod window;

pub use controller::{CongestionConfig, CongestionController, CongestionDecision};
pub use window::BufferStatusWindow;

pub use crate::limiter::{BandwidthLimiter, LimiterChange, apply_effective_limit};
#[cfg(any(test, feature = "test-support"))]
pub use crate::limiter::{RecordedSleepSession, recorded_sleep_session};
