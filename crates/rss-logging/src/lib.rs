#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_logging` installs the `tracing` subscriber shared by the worker
//! daemon, the client library, and the `rss-ctl` CLI, so every component
//! emits structured, level-filtered log events through one consistent
//! format instead of ad hoc `println!` calls.
//!
//! # Design
//!
//! [`init`] builds an [`tracing_subscriber::EnvFilter`] seeded from a
//! [`Verbosity`] level and, when set, the `RSS_LOG` environment variable
//! (which takes precedence and accepts the usual `tracing_subscriber`
//! directive syntax, e.g. `rss_worker=debug,rss_protocol=warn`). The
//! resulting subscriber writes human-readable, timestamped lines to
//! stderr; callers embedding the crates in a larger binary that installs
//! its own subscriber should build without the `tracing` feature, in which
//! case [`init`] becomes a no-op.
//!
//! # Invariants
//!
//! - [`init`] may be called at most once per process; a second call
//!   returns [`LoggingError::AlreadyInitialized`] rather than panicking,
//!   since a global subscriber can only be installed once.
//! - [`Verbosity`] orders linearly from [`Verbosity::Quiet`] to
//!   [`Verbosity::Trace`], and higher variants are always a superset of the
//!   events emitted by lower ones.
//!
//! # Errors
//!
//! [`LoggingError`] reports a failed global subscriber install, including
//! the case where one was already installed by this crate or by the
//! embedding application.
//!
//! # Examples
//!
//! ```
//! use rss_logging::{Verbosity, init};
//!
//! // Only the first call in a process actually installs a subscriber;
//! // doctests across this crate may run in the same process, so ignore
//! // the "already initialized" outcome here.
//! let _ = init(Verbosity::Info);
//! tracing::info!("worker starting");
//! ```
//!
//! # See also
//!
//! - `rss-worker` and `bin/rss-worker-bin` for the daemon that calls
//!   [`init`] once at startup based on its CLI verbosity flags.

use thiserror::Error;

/// Coarse-grained verbosity level, mapped onto a `tracing` level filter.
///
/// Ordered from least to most verbose so callers can reason about
/// `requested >= Verbosity::Debug` style comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Verbosity {
    /// Suppress all log output except explicit error reporting at the call
    /// site.
    Quiet,
    /// Warnings and errors only.
    Warn,
    /// The default level: informational progress plus warnings and errors.
    Info,
    /// Per-batch and per-partition detail, intended for troubleshooting a
    /// single run.
    Debug,
    /// Everything, including per-frame wire protocol detail. Not intended
    /// for sustained production use.
    Trace,
}

impl Verbosity {
    /// Increases verbosity by one step, saturating at [`Verbosity::Trace`].
    ///
    /// Mirrors a repeated `-v` CLI flag.
    #[must_use]
    pub const fn bump(self) -> Self {
        match self {
            Self::Quiet => Self::Warn,
            Self::Warn => Self::Info,
            Self::Info => Self::Debug,
            Self::Debug | Self::Trace => Self::Trace,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Info
    }
}

/// Errors produced while installing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// [`init`] was called more than once in this process.
    #[error("logging subscriber was already initialized")]
    AlreadyInitialized,
}

#[cfg(feature = "tracing")]
mod install {
    use super::{LoggingError, Verbosity};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tracing_subscriber::EnvFilter;

    static INSTALLED: AtomicBool = AtomicBool::new(false);

    const ENV_VAR: &str = "RSS_LOG";

    fn level_filter_str(verbosity: Verbosity) -> &'static str {
        match verbosity {
            Verbosity::Quiet => "off",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }

    /// Installs the global `tracing` subscriber at the given default
    /// verbosity, honouring `RSS_LOG` if set.
    ///
    /// # Errors
    ///
    /// Returns [`LoggingError::AlreadyInitialized`] if a subscriber was
    /// already installed, either by a prior call to this function or by the
    /// embedding application.
    pub fn init(verbosity: Verbosity) -> Result<(), LoggingError> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(LoggingError::AlreadyInitialized);
        }

        let filter = EnvFilter::try_from_env(ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(level_filter_str(verbosity)));

        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();

        if result.is_err() {
            INSTALLED.store(false, Ordering::SeqCst);
            return Err(LoggingError::AlreadyInitialized);
        }
        Ok(())
    }
}

#[cfg(feature = "tracing")]
pub use install::init;

#[cfg(not(feature = "tracing"))]
/// Stub used when the `tracing` feature is disabled; always succeeds
/// without installing a subscriber.
pub fn init(_verbosity: Verbosity) -> Result<(), LoggingError> {
    Ok(())
}
