#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rss_congestion::CongestionConfig;
use rss_logging::Verbosity;
use rss_memory::MemoryTrackerConfig;
use rss_storage::FileWriterConfig;
use rss_transport::RetryPolicy;
use rss_worker::push_handler::PushHandlerConfig;
use rss_worker::worker::{Worker, WorkerConfig};
use tracing::{error, info};

/// Command-line configuration for the shuffle worker daemon.
#[derive(Debug, Parser)]
#[command(name = "rss-worker", about = "Remote shuffle service worker daemon")]
struct Args {
    /// Address the push listener binds to.
    #[arg(long, default_value = "0.0.0.0:9870")]
    push_addr: String,
    /// Address the fetch listener binds to.
    #[arg(long, default_value = "0.0.0.0:9871")]
    fetch_addr: String,
    /// Disk mounts this worker writes partition files to; repeatable.
    #[arg(long = "mount", required = true)]
    mounts: Vec<PathBuf>,
    /// Direct-memory budget, in bytes, before pushes are paused.
    #[arg(long, default_value_t = 1 << 30)]
    max_direct_memory_bytes: u64,
    /// How often mount health is re-probed, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    device_monitor_interval_ms: u64,
    /// How often congestion state is re-evaluated, in milliseconds.
    #[arg(long, default_value_t = 1_000)]
    congestion_evaluate_interval_ms: u64,
    /// Increase log verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn verbosity_from_count(count: u8) -> Verbosity {
    let mut level = Verbosity::default();
    for _ in 0..count {
        level = level.bump();
    }
    level
}

impl Args {
    fn into_worker_config(self) -> Result<WorkerConfig, clap::Error> {
        let push_addr = self.push_addr.parse().map_err(|_| {
            clap::Error::raw(clap::error::ErrorKind::InvalidValue, format!("invalid --push-addr: {}\n", self.push_addr))
        })?;
        let fetch_addr = self.fetch_addr.parse().map_err(|_| {
            clap::Error::raw(clap::error::ErrorKind::InvalidValue, format!("invalid --fetch-addr: {}\n", self.fetch_addr))
        })?;
        Ok(WorkerConfig {
            push_handler: PushHandlerConfig {
                base_dir: self.mounts[0].clone(),
                writer: FileWriterConfig::default(),
                push_data_timeout: Duration::from_secs(60),
                replica_retry: RetryPolicy::default(),
                flusher_queue_capacity: 1024,
                flusher_threads: 2,
                slow_flush_threshold: Duration::from_millis(500),
            },
            mounts: self.mounts,
            push_addr,
            fetch_addr,
            buffer_pool: (256, 4),
            memory: MemoryTrackerConfig {
                max_bytes: self.max_direct_memory_bytes,
                pause_push_ratio: 0.9,
                pause_replicate_ratio: 0.95,
            },
            congestion: CongestionConfig {
                window: Duration::from_secs(10),
                high_watermark_bytes: self.max_direct_memory_bytes / 2,
                low_watermark_bytes: self.max_direct_memory_bytes / 10,
                per_user_cap_bytes_per_sec: 200 * 1024 * 1024,
                per_worker_cap_bytes_per_sec: 2 * 1024 * 1024 * 1024,
            },
            device_monitor_interval: Duration::from_millis(self.device_monitor_interval_ms),
            congestion_evaluate_interval: Duration::from_millis(self.congestion_evaluate_interval_ms),
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if rss_logging::init(verbosity_from_count(args.verbose)).is_err() {
        eprintln!("logging subscriber was already initialized");
    }

    let config = match args.into_worker_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(config))
}

async fn run(config: WorkerConfig) -> ExitCode {
    let push_addr = config.push_addr;
    let fetch_addr = config.fetch_addr;
    let worker = match Worker::start(config).await {
        Ok(worker) => worker,
        Err(err) => {
            error!(push_addr = %push_addr, fetch_addr = %fetch_addr, error = %err, "worker failed to start");
            return ExitCode::FAILURE;
        }
    };

    info!("rss-worker running, press Ctrl+C to stop");
    if tokio::signal::ctrl_c().await.is_err() {
        error!("failed to install Ctrl+C handler; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    worker.shutdown(Duration::from_secs(30)).await;
    ExitCode::SUCCESS
}
