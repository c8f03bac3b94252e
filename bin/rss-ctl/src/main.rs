#![deny(unsafe_code)]

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rss_checksums::CommitDigest;
use rss_client::input_stream::{InputStream, InputStreamConfig, LocationSource};
use rss_client::pusher::{DataPusher, DataPusherConfig};
use rss_compress::strategy::CompressionAlgorithmKind;
use rss_logging::Verbosity;
use rss_transport::{ConnectionPool, ExcludedEndpoints};
use rss_types::{BatchHeader, CommitMetadata, MapIdBitmap, PartitionLocation, PartitionRole, ShuffleId, StorageHint};
use tracing::{error, info};

/// A push/fetch smoke driver for exercising a running `rss-worker` without a
/// real map or reduce task.
#[derive(Debug, Parser)]
#[command(name = "rss-ctl", about = "Remote shuffle service operational CLI")]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Increase log verbosity; repeatable.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push a literal payload to a worker's push listener and print the ack.
    Push {
        /// `host:port` of the worker's push listener.
        #[arg(long)]
        endpoint: String,
        /// Partition id to push to.
        #[arg(long, default_value_t = 0)]
        partition_id: u32,
        /// Payload bytes to push, taken verbatim from the command line.
        #[arg(long, default_value = "smoke test payload")]
        payload: String,
        /// Shuffle app id the partition belongs to.
        #[arg(long, default_value = "rss-ctl-smoke")]
        app_id: String,
        /// Shuffle id within the app.
        #[arg(long, default_value_t = 0)]
        shuffle_id: u32,
    },
    /// Fetch a partition's full contents from its primary location and
    /// print the byte count received.
    Fetch {
        /// Hostname of the worker hosting the partition.
        #[arg(long)]
        host: String,
        /// Port the worker's fetch listener listens on.
        #[arg(long)]
        fetch_port: u16,
        /// Partition id to fetch.
        #[arg(long, default_value_t = 0)]
        partition_id: u32,
        /// Shuffle app id the partition belongs to.
        #[arg(long, default_value = "rss-ctl-smoke")]
        app_id: String,
        /// Shuffle id within the app.
        #[arg(long, default_value_t = 0)]
        shuffle_id: u32,
        /// Highest map id (exclusive) expected to have written this
        /// partition.
        #[arg(long, default_value_t = 1)]
        map_count: u32,
    },
}

fn verbosity_from_count(count: u8) -> Verbosity {
    let mut level = Verbosity::default();
    for _ in 0..count {
        level = level.bump();
    }
    level
}

fn main() -> ExitCode {
    let args = Args::parse();
    if rss_logging::init(verbosity_from_count(args.verbose)).is_err() {
        eprintln!("logging subscriber was already initialized");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(run(args.command))
}

async fn run(command: Command) -> ExitCode {
    match command {
        Command::Push {
            endpoint,
            partition_id,
            payload,
            app_id,
            shuffle_id,
        } => run_push(endpoint, partition_id, payload, app_id, shuffle_id).await,
        Command::Fetch {
            host,
            fetch_port,
            partition_id,
            app_id,
            shuffle_id,
            map_count,
        } => run_fetch(host, fetch_port, partition_id, app_id, shuffle_id, map_count).await,
    }
}

async fn run_push(endpoint: String, partition_id: u32, payload: String, app_id: String, shuffle_id: u32) -> ExitCode {
    let pool = Arc::new(ConnectionPool::new());
    let excluded = Arc::new(ExcludedEndpoints::new(std::time::Duration::from_secs(30)));
    let pusher = DataPusher::new(pool, excluded, DataPusherConfig::default());
    let shuffle = ShuffleId::new(app_id, shuffle_id);

    let body = payload.into_bytes();
    let mut digest = CommitDigest::new();
    digest.update(&body);

    let header = BatchHeader::new(0, 0, 0, body.len() as u32);
    let rx = pusher
        .add_task(endpoint.clone(), shuffle.clone(), partition_id, 0, header, body)
        .await;

    match rx.await {
        Ok(Ok(())) => {
            info!(endpoint, partition_id, "push acknowledged");
        }
        Ok(Err(err)) => {
            error!(endpoint, partition_id, error = %err, "push failed");
            return ExitCode::FAILURE;
        }
        Err(_) => {
            error!(endpoint, partition_id, "pusher task dropped its response channel");
            return ExitCode::FAILURE;
        }
    }

    let metadata = CommitMetadata::from_digest(digest, 1);
    let metadata_header = BatchHeader::metadata(0, 0, metadata.to_bytes().len() as u32);
    let metadata_rx = pusher
        .add_task(endpoint.clone(), shuffle, partition_id, 0, metadata_header, metadata.to_bytes().to_vec())
        .await;

    match metadata_rx.await {
        Ok(Ok(())) => {
            info!(endpoint, partition_id, "commit metadata acknowledged");
            ExitCode::SUCCESS
        }
        Ok(Err(err)) => {
            error!(endpoint, partition_id, error = %err, "commit metadata push failed");
            ExitCode::FAILURE
        }
        Err(_) => {
            error!(endpoint, partition_id, "pusher task dropped its response channel");
            ExitCode::FAILURE
        }
    }
}

async fn run_fetch(
    host: String,
    fetch_port: u16,
    partition_id: u32,
    app_id: String,
    shuffle_id: u32,
    map_count: u32,
) -> ExitCode {
    let location = PartitionLocation {
        partition_id,
        epoch: 0,
        host,
        rpc_port: 0,
        push_port: 0,
        fetch_port,
        replicate_port: 0,
        role: PartitionRole::Primary,
        peer_ref: None,
        storage_hint: StorageHint::Ssd,
        disk_mount: None,
    };
    let mut written_maps = MapIdBitmap::new();
    for map_id in 0..map_count {
        written_maps.insert(map_id);
    }
    let attempts: HashMap<u32, u32> = (0..map_count).map(|map_id| (map_id, 0)).collect();

    let mut stream = match InputStream::new(
        ShuffleId::new(app_id, shuffle_id),
        vec![LocationSource {
            location,
            replica: None,
            written_maps,
        }],
        attempts,
        0,
        map_count,
        0,
        InputStreamConfig {
            compression: CompressionAlgorithmKind::Zstd,
            ..InputStreamConfig::default()
        },
    ) {
        Ok(stream) => stream,
        Err(err) => {
            error!(error = %err, "failed to build input stream");
            return ExitCode::FAILURE;
        }
    };

    match stream.read_all().await {
        Ok(bytes) => {
            info!(partition_id, bytes = bytes.len(), "fetch complete");
            println!("{} bytes", bytes.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(partition_id, error = %err, "fetch failed");
            ExitCode::FAILURE
        }
    }
}
