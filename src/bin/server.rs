//! RowStore Server Binary
//!
//! Opens the configured buckets and serves them over TCP.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rowstore::config::{parse_bucket_names, StorageMode, MEMORY_DIRECTORY};
use rowstore::network::Server;
use rowstore::{Buckets, Config, Service};
use tracing_subscriber::{fmt, EnvFilter};

/// RowStore Server
#[derive(Parser, Debug)]
#[command(name = "rowstore-server")]
#[command(about = "Bucketed key-value store for typed records")]
#[command(version)]
struct Args {
    /// Comma-separated bucket names (letters only)
    #[arg(short, long, default_value = "default")]
    buckets: String,

    /// Data directory, or ":memory:" for volatile buckets
    #[arg(short, long, default_value = MEMORY_DIRECTORY)]
    dir: String,

    /// Scan deadline in milliseconds (0 = none)
    #[arg(short, long, default_value = "0")]
    timeout: u64,

    /// Listen address (host:port)
    #[arg(long, default_value = "0.0.0.0:8234")]
    bind: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rowstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let names = match parse_bucket_names(&args.buckets) {
        Ok(names) => names,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("RowStore Server v{}", rowstore::VERSION);
    tracing::info!("Buckets: {}", names.join(", "));
    tracing::info!("Storage: {}", args.dir);

    let config = Config::builder()
        .buckets(names)
        .storage(StorageMode::from_flag(&args.dir))
        .scan_timeout(Duration::from_millis(args.timeout))
        .listen_addr(&args.bind)
        .build();

    let buckets = match Buckets::from_config(&config) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            tracing::error!("Failed to open buckets: {}", e);
            std::process::exit(1);
        }
    };

    let service = Arc::new(Service::from_config(Arc::clone(&buckets), &config));

    let result = Server::bind(&config, service).and_then(|server| server.run());

    if let Err(e) = buckets.close() {
        tracing::warn!("Failed to close buckets: {}", e);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
