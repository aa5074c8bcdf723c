use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::StoreOutcome;

/// Counters for one ingestion cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub timestamp: DateTime<Utc>,
    pub feed_timestamp: Option<u64>,
    pub total_entities: usize,
    pub trip_updates: usize,

    // stop level
    pub stop_updates: usize,
    pub kept_stops: usize,

    // trip level
    pub enriched_trips: usize,
    pub skipped_trips: usize,
    pub stored_trips: usize,
    pub already_present: usize,
}

impl CycleStats {
    pub fn new(feed_timestamp: Option<u64>, total_entities: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            feed_timestamp,
            total_entities,
            ..Default::default()
        }
    }

    /// Reported stops that are not part of any kept trip, whether they
    /// failed to resolve or belonged to a skipped trip.
    pub fn unused_stops(&self) -> usize {
        self.stop_updates - self.kept_stops
    }

    pub fn record_outcomes(&mut self, outcomes: &[StoreOutcome]) {
        for outcome in outcomes {
            match outcome {
                StoreOutcome::Stored => self.stored_trips += 1,
                StoreOutcome::AlreadyPresent => self.already_present += 1,
            }
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of reported stops that made it into an enriched trip.
    pub fn kept_pct(&self) -> f64 {
        Self::pct(self.kept_stops, self.stop_updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(CycleStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(CycleStats::pct(50, 100), 50.0);
        assert_eq!(CycleStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_record_outcomes() {
        let mut stats = CycleStats::new(Some(1714572300), 3);
        stats.record_outcomes(&[
            StoreOutcome::Stored,
            StoreOutcome::AlreadyPresent,
            StoreOutcome::Stored,
        ]);

        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.stored_trips, 2);
        assert_eq!(stats.already_present, 1);
    }

    #[test]
    fn test_kept_pct_and_unused() {
        let stats = CycleStats {
            stop_updates: 8,
            kept_stops: 6,
            ..Default::default()
        };

        assert_eq!(stats.kept_pct(), 75.0);
        assert_eq!(stats.unused_stops(), 2);
    }
}
