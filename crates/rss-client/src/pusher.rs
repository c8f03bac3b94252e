//! Per-map-task data pusher: idle/working queues, in-flight tracking, and
//! timeout-triggered retry.

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rss_compress::strategy::{CompressionAlgorithmKind, CompressionStrategy, CompressionStrategySelector};
use rss_compress::zlib::CompressionLevel;
use rss_protocol::{Ack, Message, PushData, PushMode};
use rss_transport::{ConnectionPool, ExcludedEndpoints, RetryPolicy};
use rss_types::{BatchHeader, PartitionId, ShuffleId};
use tokio::sync::{oneshot, Semaphore};
use tracing::warn;

use crate::error::PusherError;

/// Static configuration for a [`DataPusher`].
#[derive(Debug, Clone)]
pub struct DataPusherConfig {
    /// Number of pre-allocated push slots; `add_task` blocks once this many
    /// batches are outstanding.
    pub push_queue_capacity: usize,
    /// Per-destination cap on concurrently outstanding pushes.
    pub max_in_flight_per_worker: usize,
    /// How long a push may sit in-flight before it is treated as timed out.
    pub push_data_timeout: Duration,
    /// Backoff schedule for retrying a push against the same destination.
    pub retry: RetryPolicy,
    /// How long a destination stays in the fetch-excluded set after a
    /// timeout or connection failure.
    pub exclusion_ttl: Duration,
    /// The algorithm data batch payloads are compressed with before they
    /// are sent; must match what the reading [`rss_client::input_stream::InputStream`]
    /// is configured to decompress with. Metadata batches are never
    /// compressed.
    pub compression: CompressionAlgorithmKind,
    /// Compression level passed to `compression`'s strategy.
    pub compression_level: CompressionLevel,
}

impl Default for DataPusherConfig {
    fn default() -> Self {
        Self {
            push_queue_capacity: 512,
            max_in_flight_per_worker: 32,
            push_data_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            exclusion_ttl: Duration::from_secs(30),
            compression: CompressionAlgorithmKind::Zstd,
            compression_level: CompressionLevel::Default,
        }
    }
}

struct BatchInfo {
    push_start_time: Instant,
}

/// Pushes batches for one map task, enforcing a bounded number of
/// outstanding pushes overall and per destination.
///
/// `add_task` hands a batch to a background dispatch loop and returns a
/// receiver for its outcome; the slot it occupies is released back to the
/// idle pool only once that outcome is known, so [`DataPusher::wait_on_termination`]
/// can simply wait for every slot to free up again.
pub struct DataPusher {
    config: DataPusherConfig,
    pool: Arc<ConnectionPool>,
    excluded: Arc<ExcludedEndpoints>,
    idle: Arc<Semaphore>,
    per_destination: DashMap<String, Arc<Semaphore>>,
    in_flight: DashMap<String, DashMap<u32, BatchInfo>>,
    first_error: Mutex<Option<PusherError>>,
    strategy: Box<dyn CompressionStrategy>,
    self_weak: Weak<Self>,
}

impl DataPusher {
    /// Creates a pusher sharing `pool` and `excluded` with the rest of the
    /// client.
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>, excluded: Arc<ExcludedEndpoints>, config: DataPusherConfig) -> Arc<Self> {
        let idle = Arc::new(Semaphore::new(config.push_queue_capacity));
        let strategy = CompressionStrategySelector::for_algorithm(config.compression, config.compression_level)
            .expect("configured compression algorithm is available in this build");
        Arc::new_cyclic(|self_weak| Self {
            idle,
            per_destination: DashMap::new(),
            in_flight: DashMap::new(),
            first_error: Mutex::new(None),
            strategy,
            self_weak: self_weak.clone(),
            pool,
            excluded,
            config,
        })
    }

    /// Enqueues a batch for `partition_id` at `endpoint`, blocking until an
    /// idle slot is available.
    ///
    /// `body` is compressed with the configured algorithm before it is
    /// sent, unless `header` is a metadata batch ([`BatchHeader::is_metadata`]),
    /// which is always sent uncompressed since the reading input stream
    /// never decompresses it.
    ///
    /// The returned receiver resolves once the push (and any internal
    /// retries against the same destination) has either succeeded or
    /// exhausted its retry budget.
    pub async fn add_task(
        &self,
        endpoint: String,
        shuffle_id: ShuffleId,
        partition_id: PartitionId,
        epoch: u32,
        header: BatchHeader,
        body: Vec<u8>,
    ) -> oneshot::Receiver<Result<(), PusherError>> {
        let idle_permit = self
            .idle
            .clone()
            .acquire_owned()
            .await
            .expect("idle semaphore never closed");

        let (tx, rx) = oneshot::channel();
        let this = self.self_weak.upgrade().expect("pusher dropped while add_task is in progress");
        tokio::spawn(async move {
            let result = this
                .push_with_retry(&endpoint, &shuffle_id, partition_id, epoch, header, body)
                .await;
            if let Err(err) = &result {
                let mut first_error = this.first_error.lock().expect("first_error mutex poisoned");
                if first_error.is_none() {
                    *first_error = Some(err.clone());
                }
            }
            drop(idle_permit);
            let _ = tx.send(result);
        });
        rx
    }

    async fn push_with_retry(
        &self,
        endpoint: &str,
        shuffle_id: &ShuffleId,
        partition_id: PartitionId,
        epoch: u32,
        header: BatchHeader,
        body: Vec<u8>,
    ) -> Result<(), PusherError> {
        let destination_semaphore = self
            .per_destination
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_in_flight_per_worker)))
            .clone();
        let _destination_permit = destination_semaphore
            .acquire_owned()
            .await
            .expect("destination semaphore never closed");

        let shuffle_key = format!("{shuffle_id}/{partition_id}");
        let (header, body) = if header.is_metadata() {
            (header, body)
        } else {
            let mut compressed = Vec::new();
            self.strategy
                .compress(&body, &mut compressed)
                .expect("compressing to an in-memory buffer never fails");
            (BatchHeader::new(header.map_id, header.attempt_id, header.batch_id, compressed.len() as u32), compressed)
        };

        let mut attempt = 0;
        loop {
            self.track_start(endpoint, header.batch_id);
            let push = PushData {
                shuffle_key: shuffle_key.clone(),
                partition_location_id: partition_id,
                epoch,
                mode: PushMode::Primary,
                header,
                body: body.clone(),
            };
            let outcome = self.send_once(endpoint, push).await;
            self.track_end(endpoint, header.batch_id);

            match outcome {
                Ok(()) => {
                    self.excluded.clear(endpoint);
                    return Ok(());
                }
                Err(err) if err.is_retryable() && self.config.retry.should_retry(attempt) => {
                    warn!(endpoint, attempt, error = %err, "retrying push");
                    self.excluded.mark_failed(endpoint, Instant::now());
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        self.excluded.mark_failed(endpoint, Instant::now());
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(&self, endpoint: &str, push: PushData) -> Result<(), PusherError> {
        let timeout = self.config.push_data_timeout;
        let attempt = self.pool.with_connection(endpoint, |conn| async move {
            conn.send(Message::PushData(push)).await?;
            match conn.recv().await? {
                Message::Ack(ack) => Ok(ack),
                _ => Err(rss_transport::TransportError::ClosedMidFrame {
                    endpoint: conn.endpoint().to_string(),
                }),
            }
        });

        let ack = match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(ack)) => ack,
            Ok(Err(_)) => {
                return Err(PusherError::ConnectionFail {
                    endpoint: endpoint.to_string(),
                })
            }
            Err(_) => {
                return Err(PusherError::Timeout {
                    endpoint: endpoint.to_string(),
                })
            }
        };

        match ack {
            Ack::Success | Ack::SoftSplit | Ack::HardSplit => match ack {
                Ack::SoftSplit => Err(PusherError::SoftSplit {
                    endpoint: endpoint.to_string(),
                }),
                Ack::HardSplit => Err(PusherError::HardSplit {
                    endpoint: endpoint.to_string(),
                }),
                _ => Ok(()),
            },
            Ack::StageEnd => Err(PusherError::StageEnd {
                endpoint: endpoint.to_string(),
            }),
            Ack::PushDataFailPrimary => Err(PusherError::WriteFailPrimary {
                endpoint: endpoint.to_string(),
            }),
            Ack::PushDataFailReplica => Err(PusherError::WriteFailReplica {
                endpoint: endpoint.to_string(),
            }),
            Ack::CongestControl => Err(PusherError::CongestControl {
                endpoint: endpoint.to_string(),
            }),
            Ack::PausePush => Err(PusherError::Timeout {
                endpoint: endpoint.to_string(),
            }),
        }
    }

    fn track_start(&self, endpoint: &str, batch_id: u32) {
        self.in_flight.entry(endpoint.to_string()).or_default().insert(
            batch_id,
            BatchInfo {
                push_start_time: Instant::now(),
            },
        );
    }

    fn track_end(&self, endpoint: &str, batch_id: u32) {
        if let Some(tracker) = self.in_flight.get(endpoint) {
            tracker.remove(&batch_id);
        }
    }

    /// The number of batches currently in flight to `endpoint`.
    #[must_use]
    pub fn in_flight_count(&self, endpoint: &str) -> usize {
        self.in_flight.get(endpoint).map_or(0, |tracker| tracker.len())
    }

    /// How long the oldest batch still in flight to `endpoint` has been
    /// outstanding, or `None` if nothing is in flight.
    #[must_use]
    pub fn oldest_in_flight_age(&self, endpoint: &str) -> Option<Duration> {
        self.in_flight
            .get(endpoint)
            .and_then(|tracker| tracker.iter().map(|entry| entry.push_start_time.elapsed()).max())
    }

    /// Waits until every outstanding push has completed and the idle pool
    /// is back to full capacity, then returns the first error observed (if
    /// any) across every batch pushed since construction.
    pub async fn wait_on_termination(&self) -> Result<(), PusherError> {
        let _all_idle = self
            .idle
            .acquire_many(self.config.push_queue_capacity as u32)
            .await
            .expect("idle semaphore never closed");
        match self.first_error.lock().expect("first_error mutex poisoned").clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
