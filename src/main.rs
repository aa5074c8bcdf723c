//! CLI entry point for the GTFS-RT trip tracker.
//!
//! Serves live and historical trips over HTTP, or runs ingestion cycles
//! directly from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gtfs_rt_tracker::config::{FeedConfig, StoreConfig};
use gtfs_rt_tracker::output::{append_stats, write_json};
use gtfs_rt_tracker::server;
use gtfs_rt_tracker::store::TripStore;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_tracker")]
#[command(about = "Enriches GTFS-RT trip updates with station data and keeps a trip history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve /api/trips and /api/history over HTTP
    Serve {
        #[command(flatten)]
        feed: FeedConfig,

        /// Address to listen on
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: String,
    },
    /// Run one ingestion cycle and print the enriched trips as JSON
    Ingest {
        #[command(flatten)]
        feed: FeedConfig,
    },
    /// Print the stored trip history as JSON
    History {
        #[command(flatten)]
        store: StoreConfig,
    },
    /// Run ingestion cycles at a fixed interval to build up history
    Record {
        #[command(flatten)]
        feed: FeedConfig,

        /// Seconds between cycles
        #[arg(short, long, default_value_t = 60)]
        interval: u64,

        /// Number of cycles to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_cycles: usize,

        /// Optional: CSV file to append per-cycle statistics to
        #[arg(long)]
        stats_csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { feed, bind } => {
            let ingestor = Arc::new(feed.build_ingestor()?);
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            server::serve(listener, ingestor).await?;
        }
        Commands::Ingest { feed } => {
            let ingestor = feed.build_ingestor()?;
            let result = ingestor.run_cycle().await?;
            write_json(std::io::stdout().lock(), &result.trips)?;
        }
        Commands::History { store } => {
            let store = store.open_store()?;
            let trips = store.list_history().await?;
            info!(total = trips.len(), "Trip history loaded");
            write_json(std::io::stdout().lock(), &trips)?;
        }
        Commands::Record {
            feed,
            interval,
            num_cycles,
            stats_csv,
        } => {
            record(&feed, interval, num_cycles, stats_csv.as_deref()).await?;
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_tracker.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_tracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    file_guard
}

/// Runs ingestion cycles every `interval` seconds. A failed cycle is logged
/// and the loop carries on.
#[tracing::instrument(skip(feed, stats_csv), fields(source = %feed.feed_url))]
async fn record(
    feed: &FeedConfig,
    interval: u64,
    num_cycles: usize,
    stats_csv: Option<&Path>,
) -> Result<()> {
    let ingestor = feed.build_ingestor()?;

    if num_cycles == 0 {
        info!(interval, "Recording infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_cycles, interval, "Starting recording");
    }

    let mut cycle_count = 0;

    loop {
        if num_cycles > 0 && cycle_count >= num_cycles {
            break;
        }

        cycle_count += 1;

        match ingestor.run_cycle().await {
            Ok(result) => {
                if let Some(path) = stats_csv {
                    if let Err(e) = append_stats(path, &result.stats) {
                        error!(error = %e, "Failed to write cycle statistics");
                    }
                }
            }
            Err(e) => error!(cycle = cycle_count, error = %e, "Ingestion cycle failed"),
        }

        if num_cycles == 0 || cycle_count < num_cycles {
            info!(interval, "Waiting before next cycle");
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
        }
    }

    info!(cycles = cycle_count, "Finished recording");
    Ok(())
}
