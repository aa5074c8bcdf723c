//! Protobuf parser for GTFS Realtime feeds.

use prost::{DecodeError, Message};

use crate::gtfs_rt::{FeedEntity, FeedMessage, trip_update::StopTimeUpdate};
use crate::model::{RawStopUpdate, RawTripUpdate};

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
    FeedMessage::decode(bytes)
}

/// Extracts the trip update carried by `entity`, if any.
pub fn trip_update(entity: &FeedEntity) -> Option<RawTripUpdate> {
    let update = entity.trip_update.as_ref()?;
    let trip = &update.trip;

    Some(RawTripUpdate {
        trip_id: trip.trip_id().to_string(),
        start_time: trip.start_time().to_string(),
        start_date: trip.start_date().to_string(),
        stops: update.stop_time_update.iter().map(stop_update).collect(),
    })
}

/// Collects every trip update in the feed, in entity order.
pub fn trip_updates(feed: &FeedMessage) -> Vec<RawTripUpdate> {
    feed.entity.iter().filter_map(trip_update).collect()
}

fn stop_update(stu: &StopTimeUpdate) -> RawStopUpdate {
    RawStopUpdate {
        stop_id: stu.stop_id().to_string(),
        arrival_time: stu.arrival.as_ref().and_then(|a| a.time),
        arrival_delay: stu.arrival.as_ref().and_then(|a| a.delay),
        departure_time: stu.departure.as_ref().and_then(|d| d.time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{
        FeedHeader, TripDescriptor, TripUpdate, VehiclePosition, trip_update::StopTimeEvent,
    };

    fn header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1234567890),
            incrementality: None,
            feed_version: None,
        }
    }

    #[test]
    fn test_parse_empty_bytes_returns_default_feed() {
        // prost does not enforce proto2 `required`, an empty buffer is a default feed
        let feed = parse_feed(&[]).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let result = parse_feed(&invalid_bytes);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_valid_minimal_feed() {
        let feed = FeedMessage {
            header: header(),
            entity: vec![],
        };
        let encoded = feed.encode_to_vec();
        let parsed = parse_feed(&encoded).unwrap();

        assert_eq!(parsed.header.gtfs_realtime_version, "2.0");
        assert_eq!(parsed.header.timestamp, Some(1234567890));
        assert!(trip_updates(&parsed).is_empty());
    }

    #[test]
    fn test_trip_update_extracts_optional_fields() {
        let entity = FeedEntity {
            id: "e1".to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some("OCESN123".to_string()),
                    start_time: Some("08:15:00".to_string()),
                    start_date: Some("20240501".to_string()),
                    ..Default::default()
                },
                stop_time_update: vec![
                    StopTimeUpdate {
                        stop_id: Some("StopPoint:OCETrain-87271007".to_string()),
                        arrival: Some(StopTimeEvent {
                            time: Some(1714551900),
                            delay: Some(120),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                    StopTimeUpdate {
                        stop_id: Some("87391003".to_string()),
                        departure: Some(StopTimeEvent {
                            time: Some(1714552000),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };

        let update = trip_update(&entity).unwrap();
        assert_eq!(update.trip_id, "OCESN123");
        assert_eq!(update.start_date, "20240501");
        assert_eq!(update.stops.len(), 2);
        assert_eq!(update.stops[0].arrival_time, Some(1714551900));
        assert_eq!(update.stops[0].arrival_delay, Some(120));
        assert_eq!(update.stops[0].departure_time, None);
        assert_eq!(update.stops[1].arrival_time, None);
        assert_eq!(update.stops[1].arrival_delay, None);
        assert_eq!(update.stops[1].departure_time, Some(1714552000));
    }

    #[test]
    fn test_vehicle_only_entity_has_no_trip_update() {
        let entity = FeedEntity {
            id: "v1".to_string(),
            vehicle: Some(VehiclePosition::default()),
            ..Default::default()
        };
        assert!(trip_update(&entity).is_none());
    }
}
