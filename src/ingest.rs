//! One fetch → decode → enrich → persist cycle.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::enrich::TripEnricher;
use crate::fetch::{HttpClient, fetch_source};
use crate::model::EnrichedTrip;
use crate::parser::{parse_feed, trip_updates};
use crate::stats::CycleStats;
use crate::store::TripStore;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("feed fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("feed decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("trip storage failed: {0:#}")]
    Store(anyhow::Error),
}

/// Everything a cycle produced.
#[derive(Debug)]
pub struct CycleResult {
    /// Every trip enriched this cycle, stored now or earlier, in feed order.
    pub trips: Vec<EnrichedTrip>,
    pub stats: CycleStats,
}

pub struct Ingestor {
    client: Arc<dyn HttpClient>,
    source: String,
    enricher: TripEnricher,
    store: Arc<dyn TripStore>,
}

impl Ingestor {
    pub fn new(
        client: Arc<dyn HttpClient>,
        source: impl Into<String>,
        enricher: TripEnricher,
        store: Arc<dyn TripStore>,
    ) -> Self {
        Self {
            client,
            source: source.into(),
            enricher,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn TripStore> {
        &self.store
    }

    /// Runs one full cycle. Nothing is persisted unless the feed was fetched
    /// and decoded successfully.
    #[tracing::instrument(skip(self), fields(source = %self.source))]
    pub async fn run_cycle(&self) -> Result<CycleResult, IngestError> {
        let bytes = fetch_source(self.client.as_ref(), &self.source)
            .await
            .map_err(IngestError::Fetch)?;
        debug!(bytes = bytes.len(), "Feed bytes received, parsing");

        let feed = parse_feed(&bytes)?;
        let updates = trip_updates(&feed);

        let mut stats = CycleStats::new(feed.header.timestamp, feed.entity.len());
        stats.trip_updates = updates.len();

        let mut trips = Vec::new();
        for update in &updates {
            stats.stop_updates += update.stops.len();
            match self.enricher.enrich(update) {
                Some(trip) => {
                    stats.kept_stops += trip.stops.len();
                    trips.push(trip);
                }
                None => stats.skipped_trips += 1,
            }
        }
        stats.enriched_trips = trips.len();

        let outcomes = self
            .store
            .store_all_if_new(&trips)
            .await
            .map_err(IngestError::Store)?;
        stats.record_outcomes(&outcomes);

        info!(
            entities = stats.total_entities,
            trip_updates = stats.trip_updates,
            enriched = stats.enriched_trips,
            skipped = stats.skipped_trips,
            unused_stops = stats.unused_stops(),
            stored = stats.stored_trips,
            already_present = stats.already_present,
            kept_pct = stats.kept_pct(),
            "Ingestion cycle complete"
        );

        Ok(CycleResult { trips, stats })
    }
}
