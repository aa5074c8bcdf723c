//! Human-readable renderings of feed timestamps and delays.

use chrono::DateTime;

const SECS_PER_HOUR: f64 = 3600.0;
const SECS_PER_MINUTE: f64 = 60.0;

/// Renders a POSIX timestamp as `HH:MM` in UTC.
///
/// Returns `None` when the timestamp is absent or out of range.
pub fn format_time(epoch: Option<i64>) -> Option<String> {
    let ts = DateTime::from_timestamp(epoch?, 0)?;
    Some(ts.format("%H:%M").to_string())
}

/// Renders a delay in seconds.
///
/// | Magnitude     | Output               |
/// |---------------|----------------------|
/// | absent or 0   | `on time`            |
/// | >= 3600       | `<hours> h`          |
/// | >= 60         | `<minutes> min`      |
/// | otherwise     | `<seconds> sec`      |
///
/// Hours and minutes are rounded half-to-even. Early arrivals are shown by
/// magnitude, the sign is not rendered.
pub fn format_delay(delay: Option<i32>) -> String {
    let secs = delay.unwrap_or(0).unsigned_abs();
    let magnitude = f64::from(secs);

    match secs {
        0 => "on time".to_string(),
        s if s >= 3600 => format!("{} h", (magnitude / SECS_PER_HOUR).round_ties_even()),
        s if s >= 60 => format!("{} min", (magnitude / SECS_PER_MINUTE).round_ties_even()),
        s => format!("{s} sec"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_time_absent() {
        assert_eq!(format_time(None), None);
    }

    #[test]
    fn test_format_time_is_utc_and_zero_padded() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 14, 5, 59).unwrap();
        assert_eq!(format_time(Some(ts.timestamp())), Some("14:05".to_string()));

        let early = Utc.with_ymd_and_hms(2024, 5, 1, 3, 7, 0).unwrap();
        assert_eq!(format_time(Some(early.timestamp())), Some("03:07".to_string()));
    }

    #[test]
    fn test_format_time_out_of_range() {
        assert_eq!(format_time(Some(i64::MAX)), None);
    }

    #[test]
    fn test_format_delay_thresholds() {
        assert_eq!(format_delay(None), "on time");
        assert_eq!(format_delay(Some(0)), "on time");
        assert_eq!(format_delay(Some(45)), "45 sec");
        assert_eq!(format_delay(Some(59)), "59 sec");
        assert_eq!(format_delay(Some(60)), "1 min");
        assert_eq!(format_delay(Some(125)), "2 min");
        assert_eq!(format_delay(Some(3599)), "60 min");
        assert_eq!(format_delay(Some(3600)), "1 h");
        assert_eq!(format_delay(Some(5400)), "2 h");
    }

    #[test]
    fn test_format_delay_rounds_half_to_even() {
        assert_eq!(format_delay(Some(90)), "2 min");
        assert_eq!(format_delay(Some(150)), "2 min");
        assert_eq!(format_delay(Some(210)), "4 min");
        assert_eq!(format_delay(Some(9000)), "2 h");
    }

    #[test]
    fn test_format_delay_negative_uses_magnitude() {
        assert_eq!(format_delay(Some(-45)), "45 sec");
        assert_eq!(format_delay(Some(-125)), "2 min");
        assert_eq!(format_delay(Some(-5400)), "2 h");
    }
}
