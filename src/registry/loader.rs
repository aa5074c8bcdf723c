//! CSV loaders for the two static stop reference files.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::debug;

use crate::model::StopInfo;

/// One row of the national station list (`liste-des-gares.csv`).
#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "CODE_UIC")]
    code_uic: String,
    #[serde(rename = "LIBELLE")]
    label: String,
    #[serde(rename = "Y_WGS84")]
    lat: f64,
    #[serde(rename = "X_WGS84")]
    lon: f64,
}

/// One row of a GTFS `stops.txt`-style supplementary stop list.
#[derive(Debug, Deserialize)]
struct ExtraStopRow {
    stop_id: String,
    stop_name: String,
    stop_lat: Option<f64>,
    stop_lon: Option<f64>,
}

/// Loads the `;`-delimited station list into a map keyed by UIC code.
///
/// # Errors
///
/// Fails if the file cannot be opened, a required column is missing, or a
/// coordinate does not parse as a number.
pub fn load_stations(path: &Path) -> Result<HashMap<String, StopInfo>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open station list {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .from_reader(file);

    let mut stations = HashMap::new();
    for result in rdr.deserialize() {
        let row: StationRow =
            result.with_context(|| format!("malformed row in {}", path.display()))?;
        stations.insert(row.code_uic, StopInfo::new(row.label, row.lat, row.lon));
    }

    debug!(path = %path.display(), count = stations.len(), "Loaded station list");
    Ok(stations)
}

/// Loads the `,`-delimited supplementary stop list into a map keyed by `stop_id`.
///
/// Blank coordinates are kept as `None`; unparsable ones are an error.
pub fn load_extra_stops(path: &Path) -> Result<HashMap<String, StopInfo>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open stop list {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let mut stops = HashMap::new();
    for result in rdr.deserialize() {
        let row: ExtraStopRow =
            result.with_context(|| format!("malformed row in {}", path.display()))?;
        stops.insert(
            row.stop_id,
            StopInfo {
                name: row.stop_name,
                latitude: row.stop_lat,
                longitude: row.stop_lon,
            },
        );
    }

    debug!(path = %path.display(), count = stops.len(), "Loaded supplementary stops");
    Ok(stops)
}
