//! Raw row validation into ordered samples.

use serde::Serialize;
use tracing::{debug, warn};

use geomag_common::time::parse_timestamp;
use geomag_common::TimeWindow;

use crate::error::{NowcastError, Result};
use crate::sample::{RawRecord, Sample};

/// Counters describing what happened to a station's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Rows that passed validation and fall inside the window
    pub accepted: usize,
    /// Rows dropped for malformed content
    pub rejected: usize,
    /// Rows dropped because an earlier row had the same timestamp
    pub duplicates: usize,
    /// Rows dropped because their timestamp went backwards
    pub out_of_order: usize,
    /// Valid rows outside the window
    pub out_of_window: usize,
}

impl ParseReport {
    /// Rows dropped for any reason other than falling outside the window.
    pub fn dropped(&self) -> usize {
        self.rejected + self.duplicates + self.out_of_order
    }
}

/// Parser output: samples sorted by timestamp, or empty when fewer than two
/// survive.
#[derive(Debug, Clone, Default)]
pub struct ParsedSeries {
    pub samples: Vec<Sample>,
    pub report: ParseReport,
}

/// Validate a single raw row.
pub fn parse_record(record: &RawRecord) -> Result<Sample> {
    let malformed = |reason: String| NowcastError::MalformedRecord {
        line: record.line,
        reason,
    };

    let timestamp = record
        .timestamp
        .as_deref()
        .ok_or_else(|| malformed("missing timestamp".to_string()))?;
    let timestamp = parse_timestamp(timestamp).map_err(|e| malformed(e.to_string()))?;

    let mut field = [0.0f64; 3];
    for (axis, (slot, raw)) in field.iter_mut().zip(record.components.iter()).enumerate() {
        let raw = raw
            .as_deref()
            .ok_or_else(|| malformed(format!("missing component {}", axis)))?;
        let value: f64 = raw
            .parse()
            .map_err(|_| malformed(format!("component {} is not numeric: {:?}", axis, raw)))?;
        if !value.is_finite() {
            return Err(malformed(format!("component {} is not finite: {}", axis, raw)));
        }
        *slot = value;
    }

    Ok(Sample::new(timestamp, field))
}

/// Turn a station's raw rows into an ordered sample sequence for `window`.
///
/// Malformed rows are dropped and logged, never fatal. Timestamps must
/// increase in read order: a row at or before the last accepted timestamp
/// is dropped, so for duplicates the first row read wins.
pub fn parse_records(records: &[RawRecord], window: &TimeWindow) -> ParsedSeries {
    let mut report = ParseReport::default();
    let mut samples = Vec::with_capacity(records.len());

    for record in records {
        let sample = match parse_record(record) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(source = %record.source, error = %e, "Dropping malformed row");
                report.rejected += 1;
                continue;
            }
        };
        if !window.contains(&sample.timestamp) {
            report.out_of_window += 1;
            continue;
        }

        match samples.last().map(|last: &Sample| last.timestamp) {
            Some(last) if sample.timestamp == last => report.duplicates += 1,
            Some(last) if sample.timestamp < last => {
                warn!(
                    source = %record.source,
                    line = record.line,
                    timestamp = %sample.timestamp,
                    previous = %last,
                    "Dropping non-monotonic row"
                );
                report.out_of_order += 1;
            }
            _ => samples.push(sample),
        }
    }

    if samples.len() < 2 {
        debug!(
            usable = samples.len(),
            "Fewer than two samples in window"
        );
        samples.clear();
    }
    report.accepted = samples.len();

    ParsedSeries { samples, report }
}
