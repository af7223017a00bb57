//! Common test fixtures for nowcast tests.
//!
//! This module provides pre-defined registries, times and raw partition
//! bodies that represent common scenarios in magnetometer processing.

use chrono::{DateTime, TimeZone, Utc};
use geomag_common::{BaseThresholds, Region, Station, StationRegistry};

/// A fixed reference time for tests (2024-05-10T12:00:00Z).
pub const REFERENCE_TIME: &str = "2024-05-10T12:00:00Z";

/// `REFERENCE_TIME` as a `DateTime`.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

/// Five minutes past midnight UTC, for windows that straddle two days.
pub fn just_after_midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 11, 0, 5, 0).unwrap()
}

/// A station with placeholder coordinates.
pub fn station(id: &str) -> Station {
    Station {
        id: id.to_string(),
        name: format!("{} Magnetic Observatory", id),
        latitude: -43.42,
        longitude: 172.35,
        region: "Canterbury".to_string(),
    }
}

/// A region whose display name equals its id.
pub fn region(id: &str, multiplier: f64, stations: &[&str]) -> Region {
    Region {
        id: id.to_string(),
        display_name: id.to_string(),
        multiplier,
        stations: stations.iter().map(|s| s.to_string()).collect(),
    }
}

/// One region backed by the given stations, default base thresholds (20/50).
pub fn single_region_registry(multiplier: f64, stations: &[&str]) -> StationRegistry {
    StationRegistry::new(
        BaseThresholds::default(),
        stations.iter().map(|id| station(id)).collect(),
        vec![region("Canterbury", multiplier, stations)],
    )
    .expect("fixture registry is valid")
}

/// Two regions with disjoint stations: "North" (NTH1) and "South"
/// (STH1, STH2).
pub fn two_region_registry() -> StationRegistry {
    StationRegistry::new(
        BaseThresholds::default(),
        vec![station("NTH1"), station("STH1"), station("STH2")],
        vec![
            region("North", 2.0, &["NTH1"]),
            region("South", 1.0, &["STH1", "STH2"]),
        ],
    )
    .expect("fixture registry is valid")
}

/// Raw partition bodies with specific defects.
pub mod csv {
    /// Valid header with a mix of good and broken rows.
    ///
    /// Rows 2 and 4 are good; the rest are missing a component, non-numeric,
    /// or carry an unparseable timestamp.
    pub const MIXED_ROWS: &str = "timestamp,x,y,z\n\
2024-05-10T11:50:00Z,100.0,0.0,0.0\n\
2024-05-10T11:51:00Z,101.0\n\
2024-05-10T11:52:00Z,110.0,0.0,0.0\n\
2024-05-10T11:53:00Z,abc,0.0,0.0\n\
not-a-time,120.0,0.0,0.0\n";

    /// Columns in a different order and capitalised.
    pub const REORDERED_HEADER: &str = "Z,Time,X,Y\n\
0.0,2024-05-10T11:58:00Z,200.0,0.0\n\
0.0,2024-05-10T11:59:00Z,206.0,8.0\n";

    /// No usable header at all.
    pub const NO_HEADER: &str = "2024-05-10T11:58:00Z,1,2,3\n";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_registries_validate() {
        single_region_registry(1.5, &["EY2M"]).validate().unwrap();
        two_region_registry().validate().unwrap();
    }

    #[test]
    fn test_reference_time_matches_constant() {
        assert_eq!(reference_time().to_rfc3339(), "2024-05-10T12:00:00+00:00");
        assert_eq!(
            DateTime::parse_from_rfc3339(REFERENCE_TIME).unwrap(),
            reference_time()
        );
    }
}
