//! Time handling utilities for magnetometer time series.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GeomagError, GeomagResult};

/// A closed time interval `[start, end]` in UTC.
///
/// The pipeline only ever looks at a trailing window ending "now", but the
/// window is passed around explicitly so every stage is testable against a
/// fixed clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> GeomagResult<Self> {
        if start > end {
            return Err(GeomagError::InvalidTime(format!(
                "window start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `length` ending at `end`.
    pub fn trailing(end: DateTime<Utc>, length: Duration) -> Self {
        let length = if length < Duration::zero() {
            Duration::zero()
        } else {
            length
        };
        Self {
            start: end - length,
            end,
        }
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Every UTC calendar day touched by the window, oldest first.
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = self.end.date_naive();
        first
            .iter_days()
            .take_while(|day| *day <= last)
            .collect()
    }
}

/// Address of one day partition of a station's data in the upstream store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub station: String,
    pub date: NaiveDate,
}

impl PartitionKey {
    pub fn new(station: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            station: station.into(),
            date,
        }
    }

    /// Storage path for this partition.
    /// Format: {prefix}/{station}/{year}/{month}/{day}
    pub fn object_prefix(&self, prefix: &str) -> String {
        let tail = format!(
            "{}/{:04}/{:02}/{:02}",
            self.station,
            self.date.year(),
            self.date.month(),
            self.date.day()
        );
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            tail
        } else {
            format!("{}/{}", prefix, tail)
        }
    }
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.station, self.date.format("%Y-%m-%d"))
    }
}

/// Partition keys a fetch for `station` over `window` has to read.
///
/// A window crossing midnight UTC yields one key per day; the fetcher
/// concatenates them in order.
pub fn partition_keys(station: &str, window: &TimeWindow) -> Vec<PartitionKey> {
    window
        .days()
        .into_iter()
        .map(|date| PartitionKey::new(station, date))
        .collect()
}

/// Parse a timestamp as written by magnetometer exports.
///
/// Accepts RFC 3339 and the common naive forms, which are taken as UTC.
pub fn parse_timestamp(s: &str) -> GeomagResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // "2024-01-15 12:00:00+00:00" style, as pandas writes it
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(GeomagError::InvalidTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2024-05-10T18:30:00Z").unwrap();
        assert_eq!(dt, utc(2024, 5, 10, 18, 30, 0));
    }

    #[test]
    fn test_parse_naive_forms() {
        assert_eq!(
            parse_timestamp("2024-05-10 18:30:00").unwrap(),
            utc(2024, 5, 10, 18, 30, 0)
        );
        let frac = parse_timestamp("2024-05-10T18:30:00.500").unwrap();
        assert_eq!(frac.second(), 0);
        assert_eq!(frac.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_offset() {
        let dt = parse_timestamp("2024-05-11T06:30:00+12:00").unwrap();
        assert_eq!(dt, utc(2024, 5, 10, 18, 30, 0));

        let pandas = parse_timestamp("2024-05-10 18:30:00+00:00").unwrap();
        assert_eq!(pandas, utc(2024, 5, 10, 18, 30, 0));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_window_rejects_inverted() {
        assert!(TimeWindow::new(utc(2024, 1, 2, 0, 0, 0), utc(2024, 1, 1, 0, 0, 0)).is_err());
    }

    #[test]
    fn test_window_contains_is_closed() {
        let w = TimeWindow::trailing(utc(2024, 1, 1, 12, 15, 0), Duration::minutes(15));
        assert!(w.contains(&utc(2024, 1, 1, 12, 0, 0)));
        assert!(w.contains(&utc(2024, 1, 1, 12, 15, 0)));
        assert!(!w.contains(&utc(2024, 1, 1, 11, 59, 59)));
    }

    #[test]
    fn test_partition_keys_single_day() {
        let w = TimeWindow::trailing(utc(2024, 3, 1, 12, 0, 0), Duration::minutes(15));
        let keys = partition_keys("EY2M", &w);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_partition_keys_across_midnight() {
        let w = TimeWindow::trailing(utc(2024, 3, 1, 0, 5, 0), Duration::minutes(15));
        let keys = partition_keys("EY2M", &w);
        assert_eq!(
            keys,
            vec![
                PartitionKey::new("EY2M", NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
                PartitionKey::new("EY2M", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            ]
        );
    }

    #[test]
    fn test_partition_keys_across_year_end() {
        let w = TimeWindow::trailing(utc(2025, 1, 1, 0, 0, 0), Duration::minutes(1));
        let keys = partition_keys("SMHS", &w);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].object_prefix(""), "SMHS/2024/12/31");
        assert_eq!(keys[1].object_prefix(""), "SMHS/2025/01/01");
    }

    #[test]
    fn test_object_prefix_trims_slashes() {
        let key = PartitionKey::new("AHAM", NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
        assert_eq!(key.object_prefix("geomag/"), "geomag/AHAM/2024/07/04");
        assert_eq!(key.object_prefix("/geomag"), "geomag/AHAM/2024/07/04");
    }
}
