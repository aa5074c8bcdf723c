//! Runtime configuration, read from CLI flags or the environment (`.env` included).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use crate::enrich::TripEnricher;
use crate::fetch::BasicClient;
use crate::ingest::Ingestor;
use crate::registry::StopRegistry;
use crate::store::SqliteTripStore;

/// Where the trip database lives.
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "data/trips.db")]
    pub database: PathBuf,
}

impl StoreConfig {
    pub fn open_store(&self) -> Result<SqliteTripStore> {
        SqliteTripStore::open(&self.database)
    }
}

/// Everything needed to run an ingestion cycle.
#[derive(Debug, Clone, Args)]
pub struct FeedConfig {
    /// GTFS-RT trip updates URL, or a path to a local protobuf file
    #[arg(long, env = "GTFS_RT_URL")]
    pub feed_url: String,

    /// Station list (`;`-delimited, keyed by CODE_UIC)
    #[arg(long, env = "STATIONS_CSV", default_value = "data/liste-des-gares.csv")]
    pub stations: PathBuf,

    /// Supplementary GTFS stops (`stop_id,stop_name,stop_lat,stop_lon`)
    #[arg(long, env = "EXTRA_STOPS_CSV", default_value = "data/stops_update.txt")]
    pub extra_stops: PathBuf,

    /// Feed request timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout: u64,

    #[command(flatten)]
    pub store: StoreConfig,
}

impl FeedConfig {
    pub fn load_registry(&self) -> Result<StopRegistry> {
        StopRegistry::load(&self.stations, &self.extra_stops)
            .context("failed to load stop registry")
    }

    /// Loads the registry, opens the store and wires them into an [`Ingestor`].
    pub fn build_ingestor(&self) -> Result<Ingestor> {
        let registry = Arc::new(self.load_registry()?);
        let store = Arc::new(self.store.open_store()?);
        let client = Arc::new(BasicClient::new(Duration::from_secs(self.fetch_timeout))?);

        Ok(Ingestor::new(
            client,
            self.feed_url.clone(),
            TripEnricher::new(registry),
            store,
        ))
    }
}
