//! Static stop registry.
//!
//! [`StopRegistry`] holds the two reference tables the feed's stop ids are
//! resolved against: stations keyed by UIC code, and supplementary stops
//! keyed by their raw GTFS `stop_id`. It is built once at startup and shared
//! read-only afterwards.

mod loader;

pub use loader::{load_extra_stops, load_stations};

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::model::StopInfo;

/// Separator between the namespace prefix and the UIC code in composite stop ids
/// such as `StopPoint:OCETrain TER-87271007`.
const STOP_ID_SEPARATOR: char = '-';

/// Read-only stop lookup: the primary station list keyed by UIC code, and
/// supplementary stops keyed by full feed stop id.
#[derive(Debug, Default, Clone)]
pub struct StopRegistry {
    stations: HashMap<String, StopInfo>,
    extra_stops: HashMap<String, StopInfo>,
}

impl StopRegistry {
    pub fn new(
        stations: HashMap<String, StopInfo>,
        extra_stops: HashMap<String, StopInfo>,
    ) -> Self {
        Self {
            stations,
            extra_stops,
        }
    }

    /// Loads both reference files, failing on the first malformed row.
    pub fn load(stations_path: &Path, extra_stops_path: &Path) -> Result<Self> {
        let stations = load_stations(stations_path)?;
        let extra_stops = load_extra_stops(extra_stops_path)?;

        info!(
            stations = stations.len(),
            extra_stops = extra_stops.len(),
            "Stop registry loaded"
        );

        Ok(Self::new(stations, extra_stops))
    }

    /// Resolves a feed stop id.
    ///
    /// The station table is queried with [`station_code`]; on a miss the
    /// supplementary table is queried with the unmodified id.
    pub fn resolve(&self, stop_id: &str) -> Option<&StopInfo> {
        self.stations
            .get(station_code(stop_id))
            .or_else(|| self.extra_stops.get(stop_id))
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn extra_stop_count(&self) -> usize {
        self.extra_stops.len()
    }
}

/// Returns the part of `stop_id` after the last `-`, or the whole id when
/// there is none.
pub fn station_code(stop_id: &str) -> &str {
    stop_id
        .rsplit_once(STOP_ID_SEPARATOR)
        .map_or(stop_id, |(_, code)| code)
}
