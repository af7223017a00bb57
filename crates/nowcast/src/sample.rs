//! Raw and validated magnetometer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row as delivered by the source, before validation.
///
/// Fields are kept as text; a component is `None` when the row was too
/// short to hold that column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Object key the row was read from
    pub source: String,
    /// 1-based line number within that object
    pub line: u64,
    pub timestamp: Option<String>,
    pub components: [Option<String>; 3],
}

impl RawRecord {
    /// Convenience constructor for fully populated rows.
    pub fn new(source: impl Into<String>, line: u64, timestamp: &str, components: [&str; 3]) -> Self {
        Self {
            source: source.into(),
            line,
            timestamp: Some(timestamp.to_string()),
            components: components.map(|c| Some(c.to_string())),
        }
    }
}

/// A validated field measurement: UTC timestamp and (x, y, z) in nT.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub field: [f64; 3],
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, field: [f64; 3]) -> Self {
        Self { timestamp, field }
    }

    /// Euclidean norm of the field difference to `other`, in nT.
    pub fn distance(&self, other: &Sample) -> f64 {
        let dx = self.field[0] - other.field[0];
        let dy = self.field[1] - other.field[1];
        let dz = self.field[2] - other.field[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_distance_is_euclidean() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let a = Sample::new(t, [0.0, 0.0, 0.0]);
        let b = Sample::new(t, [3.0, 4.0, 12.0]);
        assert_eq!(a.distance(&b), 13.0);
        assert_eq!(b.distance(&a), 13.0);
    }
}
