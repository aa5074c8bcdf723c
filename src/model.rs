//! Fixed-shape records flowing through the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stop-time update as reported by the feed, before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStopUpdate {
    pub stop_id: String,
    pub arrival_time: Option<i64>,
    pub arrival_delay: Option<i32>,
    pub departure_time: Option<i64>,
}

/// The trip-update half of a feed entity, flattened out of the protobuf types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTripUpdate {
    pub trip_id: String,
    pub start_time: String,
    pub start_date: String,
    pub stops: Vec<RawStopUpdate>,
}

/// Static station metadata.
///
/// Coordinates are optional because the supplementary stop list allows
/// blank `stop_lat`/`stop_lon` cells. Primary registry entries always carry
/// both.
#[derive(Debug, Clone, PartialEq)]
pub struct StopInfo {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StopInfo {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

/// A stop that resolved against the registry with a name and both coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedStop {
    pub stop_id: String,
    pub stop_name: String,
    pub arrival: Option<String>,
    pub departure: Option<String>,
    pub delay: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
}

/// A trip with at least two enriched stops, in feed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrip {
    pub trip_id: String,
    pub start_time: String,
    pub start_date: String,
    pub stops: Vec<EnrichedStop>,
}

/// A trip as persisted on first sight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrip {
    pub trip_id: String,
    pub start_time: String,
    pub start_date: String,
    pub stops: Vec<EnrichedStop>,
    pub created_at: DateTime<Utc>,
}
