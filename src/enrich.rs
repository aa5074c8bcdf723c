//! Turns raw trip updates into enriched trips.
//!
//! Each stop-time update is resolved against the [`StopRegistry`] and
//! rendered with [`format_time`]/[`format_delay`]. Stops that do not resolve
//! to a named, geolocated station are dropped; trips left with fewer than
//! [`MIN_STOPS`] stops are skipped entirely. Nothing here touches storage.

use std::sync::Arc;

use tracing::trace;

use crate::format::{format_delay, format_time};
use crate::model::{EnrichedStop, EnrichedTrip, RawStopUpdate, RawTripUpdate};
use crate::registry::StopRegistry;

/// Minimum number of enriched stops for a trip to be kept.
pub const MIN_STOPS: usize = 2;

#[derive(Debug, Clone)]
pub struct TripEnricher {
    registry: Arc<StopRegistry>,
}

impl TripEnricher {
    pub fn new(registry: Arc<StopRegistry>) -> Self {
        Self { registry }
    }

    /// Enriches one trip update, or returns `None` if the trip should be skipped.
    pub fn enrich(&self, update: &RawTripUpdate) -> Option<EnrichedTrip> {
        if update.trip_id.is_empty() {
            trace!("Trip update without trip_id skipped");
            return None;
        }

        let stops: Vec<EnrichedStop> = update
            .stops
            .iter()
            .filter_map(|stu| self.enrich_stop(stu))
            .collect();

        if stops.len() < MIN_STOPS {
            trace!(
                trip_id = %update.trip_id,
                resolved = stops.len(),
                reported = update.stops.len(),
                "Trip skipped, not enough resolvable stops"
            );
            return None;
        }

        Some(EnrichedTrip {
            trip_id: update.trip_id.clone(),
            start_time: update.start_time.clone(),
            start_date: update.start_date.clone(),
            stops,
        })
    }

    /// Resolves and formats a single stop, `None` meaning "drop it".
    pub fn enrich_stop(&self, stu: &RawStopUpdate) -> Option<EnrichedStop> {
        let Some(info) = self.registry.resolve(&stu.stop_id) else {
            trace!(stop_id = %stu.stop_id, "Unknown stop dropped");
            return None;
        };

        let name = info.name.trim();
        let (Some(lat), Some(lon)) = (info.latitude, info.longitude) else {
            trace!(stop_id = %stu.stop_id, "Stop without coordinates dropped");
            return None;
        };
        if name.is_empty() {
            trace!(stop_id = %stu.stop_id, "Unnamed stop dropped");
            return None;
        }

        Some(EnrichedStop {
            stop_id: stu.stop_id.clone(),
            stop_name: name.to_string(),
            arrival: format_time(stu.arrival_time),
            departure: format_time(stu.departure_time),
            delay: format_delay(stu.arrival_delay),
            stop_lat: lat,
            stop_lon: lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StopInfo;
    use std::collections::HashMap;

    fn enricher() -> TripEnricher {
        let stations = HashMap::from([
            ("87271007".to_string(), StopInfo::new("Paris Nord", 48.8809, 2.3553)),
            ("87313874".to_string(), StopInfo::new("Creil", 49.2636, 2.4689)),
            ("87317065".to_string(), StopInfo::new("   ", 49.0, 2.0)),
        ]);
        let extra_stops = HashMap::from([
            ("StopArea:OCE1".to_string(), StopInfo::new("Gare routière", 45.1, 5.7)),
            (
                "StopArea:OCE2".to_string(),
                StopInfo {
                    name: "Sans position".to_string(),
                    latitude: None,
                    longitude: Some(5.7),
                },
            ),
        ]);
        TripEnricher::new(Arc::new(StopRegistry::new(stations, extra_stops)))
    }

    fn stop(stop_id: &str) -> RawStopUpdate {
        RawStopUpdate {
            stop_id: stop_id.to_string(),
            ..Default::default()
        }
    }

    fn trip(stops: Vec<RawStopUpdate>) -> RawTripUpdate {
        RawTripUpdate {
            trip_id: "OCESN847915F".to_string(),
            start_time: "06:12:00".to_string(),
            start_date: "20240501".to_string(),
            stops,
        }
    }

    #[test]
    fn test_enrich_keeps_feed_order_and_drops_unknown_stops() {
        let update = trip(vec![
            stop("StopPoint:OCETrain TER-87271007"),
            stop("StopPoint:OCETrain TER-00000000"),
            stop("StopPoint:OCETrain TER-87313874"),
        ]);

        let enriched = enricher().enrich(&update).unwrap();
        assert_eq!(enriched.trip_id, "OCESN847915F");
        assert_eq!(enriched.start_time, "06:12:00");
        assert_eq!(enriched.start_date, "20240501");

        let names: Vec<_> = enriched.stops.iter().map(|s| s.stop_name.as_str()).collect();
        assert_eq!(names, vec!["Paris Nord", "Creil"]);
        assert_eq!(enriched.stops[1].stop_id, "StopPoint:OCETrain TER-87313874");
    }

    #[test]
    fn test_enrich_skips_trip_with_one_resolvable_stop() {
        let update = trip(vec![stop("87271007"), stop("nowhere")]);
        assert!(enricher().enrich(&update).is_none());

        let update = trip(vec![stop("87271007")]);
        assert!(enricher().enrich(&update).is_none());
    }

    #[test]
    fn test_enrich_skips_trip_without_id() {
        let mut update = trip(vec![stop("87271007"), stop("87313874")]);
        update.trip_id.clear();
        assert!(enricher().enrich(&update).is_none());
    }

    #[test]
    fn test_stops_without_name_or_coordinates_are_dropped() {
        let enricher = enricher();
        assert!(enricher.enrich_stop(&stop("87317065")).is_none());
        assert!(enricher.enrich_stop(&stop("StopArea:OCE2")).is_none());
        assert!(enricher.enrich_stop(&stop("StopArea:OCE1")).is_some());
    }

    #[test]
    fn test_enrich_stop_formats_times_and_delay() {
        let stu = RawStopUpdate {
            stop_id: "StopPoint:OCETrain TER-87271007".to_string(),
            // 2024-05-01 14:05:00 UTC
            arrival_time: Some(1714572300),
            arrival_delay: Some(125),
            departure_time: Some(1714572420),
        };

        let enriched = enricher().enrich_stop(&stu).unwrap();
        assert_eq!(enriched.arrival.as_deref(), Some("14:05"));
        assert_eq!(enriched.departure.as_deref(), Some("14:07"));
        assert_eq!(enriched.delay, "2 min");
        assert_eq!(enriched.stop_lat, 48.8809);
        assert_eq!(enriched.stop_lon, 2.3553);
    }

    #[test]
    fn test_enrich_stop_missing_fields() {
        let enriched = enricher().enrich_stop(&stop("87271007")).unwrap();
        assert_eq!(enriched.arrival, None);
        assert_eq!(enriched.departure, None);
        assert_eq!(enriched.delay, "on time");
    }
}
