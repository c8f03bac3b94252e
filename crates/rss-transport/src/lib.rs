#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `rss_transport` owns the TCP connection lifecycle between producers,
//! workers, and consumers: opening and reusing connections, tracking
//! endpoints that recently failed, and the backoff schedule a caller
//! retries with. It frames bytes using [`rss_protocol::FrameCodec`] but has
//! no opinion on which messages a caller sends.
//!
//! # Design
//!
//! - [`connection`] defines [`Connection`], one framed socket to an
//!   endpoint.
//! - [`pool`] defines [`ConnectionPool`], which reuses at most one live
//!   connection per endpoint and tears it down on the first error so the
//!   next caller reconnects.
//! - [`excluded`] defines [`ExcludedEndpoints`], the fetch-excluded set a
//!   timed-out push or fetch registers its endpoint in.
//! - [`retry`] defines [`RetryPolicy`], an exponential backoff schedule
//!   with a cap.
//! - [`error`] defines [`TransportError`].
//!
//! # See also
//!
//! - `rss-client`'s data pusher and input stream, the two callers that
//!   combine a [`ConnectionPool`] with a [`RetryPolicy`] and
//!   [`ExcludedEndpoints`] on failure.
//! - `rss-worker`'s push handler, which accepts the connections this
//!   crate's client side opens.

pub mod connection;
pub mod error;
pub mod excluded;
pub mod pool;
pub mod retry;

pub use connection::Connection;
pub use error::TransportError;
pub use excluded::ExcludedEndpoints;
pub use pool::ConnectionPool;
pub use retry::RetryPolicy;
