//! Ties the push handler, fetch server, and background maintenance loops
//! together into one running worker.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rss_congestion::{CongestionConfig, CongestionController};
use rss_memory::{BufferPool, MemoryTracker, MemoryTrackerConfig};
use rss_registry::PartitionLocationRegistry;
use rss_storage::{ChunkOffsetIndex, DeviceMonitor};
use rss_transport::ConnectionPool;
use rss_types::MapIdBitmap;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::WorkerError;
use crate::fetch_server::FetchServer;
use crate::push_handler::{PushHandler, PushHandlerConfig};

/// Everything needed to start a [`Worker`].
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Disk mounts this worker writes partition files to.
    pub mounts: Vec<PathBuf>,
    /// Address the push listener binds.
    pub push_addr: SocketAddr,
    /// Address the fetch listener binds.
    pub fetch_addr: SocketAddr,
    /// Buffer pool sizing (buffer count, slabs per buffer).
    pub buffer_pool: (usize, usize),
    /// Direct-memory back-pressure thresholds.
    pub memory: MemoryTrackerConfig,
    /// Congestion watermark and rate-cap configuration.
    pub congestion: CongestionConfig,
    /// Push handler tuning (writer config, replica retry, flusher sizing).
    pub push_handler: PushHandlerConfig,
    /// How often [`DeviceMonitor::probe_all`] runs.
    pub device_monitor_interval: Duration,
    /// How often [`CongestionController::evaluate`] runs against the
    /// memory tracker's current total.
    pub congestion_evaluate_interval: Duration,
}

/// A running shuffle worker: bound listeners plus their background
/// maintenance tasks.
///
/// Dropping a `Worker` does not stop it; call [`Worker::shutdown`] to stop
/// the maintenance loops and wait (up to a timeout) for in-flight
/// connections to finish on their own.
pub struct Worker {
    push_handler: Arc<PushHandler>,
    fetch_server: Arc<FetchServer>,
    device_monitor: Arc<DeviceMonitor>,
    congestion: Arc<CongestionController>,
    memory: Arc<MemoryTracker>,
    tasks: Vec<JoinHandle<()>>,
}

impl Worker {
    /// Binds the push and fetch listeners and spawns the accept loops and
    /// background maintenance tasks.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::NoMountsConfigured`] if `config.mounts` is
    /// empty, or [`WorkerError::Bind`] if either listener fails to bind.
    pub async fn start(config: WorkerConfig) -> Result<Self, WorkerError> {
        if config.mounts.is_empty() {
            return Err(WorkerError::NoMountsConfigured);
        }

        let device_monitor = Arc::new(DeviceMonitor::new());
        for mount in &config.mounts {
            device_monitor.register(mount.clone());
        }

        let (memory, _memory_rx) = MemoryTracker::new(config.memory);
        let memory = Arc::new(memory);
        let pool = BufferPool::with_tracker(config.buffer_pool.0, config.buffer_pool.1, Some(memory.clone()));
        let congestion = Arc::new(CongestionController::new(config.congestion));
        let registry = Arc::new(PartitionLocationRegistry::new());
        let replica_pool = Arc::new(ConnectionPool::new());
        let indices: Arc<DashMap<String, ChunkOffsetIndex>> = Arc::new(DashMap::new());
        let map_bitmaps: Arc<DashMap<String, MapIdBitmap>> = Arc::new(DashMap::new());

        let push_handler = Arc::new(PushHandler::new(
            registry,
            pool,
            device_monitor.clone(),
            congestion.clone(),
            memory.clone(),
            replica_pool,
            indices.clone(),
            map_bitmaps.clone(),
            config.push_handler.clone(),
        ));
        let fetch_server = Arc::new(FetchServer::new(config.push_handler.base_dir.clone(), indices, map_bitmaps));

        let push_listener = TcpListener::bind(config.push_addr).await.map_err(|source| WorkerError::Bind {
            addr: config.push_addr.to_string(),
            source,
        })?;
        let fetch_listener = TcpListener::bind(config.fetch_addr).await.map_err(|source| WorkerError::Bind {
            addr: config.fetch_addr.to_string(),
            source,
        })?;

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(crate::server::run_push_listener(push_listener, push_handler.clone())));
        tasks.push(tokio::spawn(crate::server::run_fetch_listener(fetch_listener, fetch_server.clone())));
        tasks.push(tokio::spawn(device_monitor_loop(device_monitor.clone(), config.device_monitor_interval)));
        tasks.push(tokio::spawn(congestion_loop(
            congestion.clone(),
            memory.clone(),
            config.congestion_evaluate_interval,
        )));

        info!(push_addr = %config.push_addr, fetch_addr = %config.fetch_addr, "worker started");

        Ok(Self {
            push_handler,
            fetch_server,
            device_monitor,
            congestion,
            memory,
            tasks,
        })
    }

    /// The worker's push handler, for tests that need to drive it directly.
    #[must_use]
    pub fn push_handler(&self) -> &Arc<PushHandler> {
        &self.push_handler
    }

    /// The worker's fetch server, for tests that need to drive it directly.
    #[must_use]
    pub fn fetch_server(&self) -> &Arc<FetchServer> {
        &self.fetch_server
    }

    /// The worker's device monitor.
    #[must_use]
    pub fn device_monitor(&self) -> &Arc<DeviceMonitor> {
        &self.device_monitor
    }

    /// The worker's congestion controller.
    #[must_use]
    pub fn congestion(&self) -> &Arc<CongestionController> {
        &self.congestion
    }

    /// The worker's memory tracker.
    #[must_use]
    pub fn memory(&self) -> &Arc<MemoryTracker> {
        &self.memory
    }

    /// Stops every background task, waiting up to `timeout` for them to
    /// finish their current iteration before aborting what's left.
    ///
    /// Accept loops are aborted immediately rather than drained, since a
    /// listener has no natural end of work to wait for; in-flight
    /// connections finish their current request (the push handler does not
    /// retract an ack already sent) but accept no new ones.
    pub async fn shutdown(mut self, timeout: Duration) {
        for task in &self.tasks {
            task.abort();
        }
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        for task in self.tasks.drain(..) {
            tokio::select! {
                _ = task => {}
                () = &mut deadline => {
                    warn!("worker shutdown timed out waiting for background tasks");
                    break;
                }
            }
        }
    }
}

async fn device_monitor_loop(device_monitor: Arc<DeviceMonitor>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        for (mount, health) in device_monitor.probe_all() {
            warn!(mount = %mount.display(), health = ?health, "mount health changed");
        }
    }
}

async fn congestion_loop(congestion: Arc<CongestionController>, memory: Arc<MemoryTracker>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        congestion.evaluate(memory.total_bytes(), Instant::now());
    }
}
