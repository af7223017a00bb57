//! Sample fetching from the day-partitioned magnetometer archive.
//!
//! Each station's data is split into one prefix per UTC day. A fetch lists
//! every partition the window touches, downloads each object under it
//! (gunzipping `.gz` files) and decodes the CSV rows into [`RawRecord`]s.

use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::{debug, info, instrument, warn};

use geomag_common::time::partition_keys;
use geomag_common::{GeomagError, TimeWindow};
use storage::ObjectStorage;

use crate::error::{NowcastError, Result};
use crate::metrics;
use crate::sample::RawRecord;

/// Column names accepted for the timestamp column (case-insensitive).
const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "time", "datetime"];

/// Trait for sources that can return a station's raw rows for a window.
#[async_trait]
pub trait SampleFetcher: Send + Sync {
    /// Fetch every raw row covering `window`, partitions concatenated oldest
    /// first.
    ///
    /// Fails with `NotFound` when no partition exists and
    /// `SourceUnavailable` on transport errors.
    async fn fetch(&self, station: &str, window: &TimeWindow) -> Result<Vec<RawRecord>>;
}

/// Fetcher reading partitions from object storage.
pub struct ObjectStoreFetcher {
    storage: Arc<ObjectStorage>,
    /// Key prefix in front of `{station}/{year}/{month}/{day}`
    prefix: String,
    /// CSV column names of the three field components
    components: [String; 3],
}

impl ObjectStoreFetcher {
    pub fn new(storage: Arc<ObjectStorage>, prefix: impl Into<String>, components: [String; 3]) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            components,
        }
    }

    fn unavailable(station: &str, err: GeomagError) -> NowcastError {
        NowcastError::SourceUnavailable {
            station: station.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl SampleFetcher for ObjectStoreFetcher {
    #[instrument(skip(self, window), fields(bucket = %self.storage.bucket()))]
    async fn fetch(&self, station: &str, window: &TimeWindow) -> Result<Vec<RawRecord>> {
        let keys = partition_keys(station, window);
        let mut records = Vec::new();
        let mut found_partitions = 0usize;

        for key in &keys {
            let prefix = key.object_prefix(&self.prefix);
            let objects = self
                .storage
                .list(&prefix)
                .await
                .map_err(|e| Self::unavailable(station, e))?;

            if objects.is_empty() {
                debug!(partition = %key, "No objects for partition");
                continue;
            }
            found_partitions += 1;

            for path in objects {
                let data = match self.storage.get(&path).await {
                    Ok(data) => data,
                    // Listed but gone by the time we read it
                    Err(e) if e.is_not_found() => {
                        warn!(path = %path, "Listed object disappeared");
                        continue;
                    }
                    Err(e) => return Err(Self::unavailable(station, e)),
                };

                match decode_partition(&path, data, &self.components) {
                    Ok(mut rows) => {
                        debug!(path = %path, rows = rows.len(), "Decoded partition object");
                        records.append(&mut rows);
                    }
                    Err(e) => {
                        warn!(path = %path, error = %e, "Skipping undecodable partition object");
                        metrics::record_undecodable_object(station);
                    }
                }
            }
        }

        if found_partitions == 0 {
            return Err(NowcastError::NotFound(station.to_string()));
        }

        info!(
            station = %station,
            partitions = found_partitions,
            rows = records.len(),
            "Fetched raw records"
        );
        Ok(records)
    }
}

/// Decompress an object body when its key ends in `.gz`.
pub fn decompress(path: &str, data: Bytes) -> Result<Bytes> {
    if !path.ends_with(".gz") {
        return Ok(data);
    }

    let mut decoder = GzDecoder::new(&data[..]);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| NowcastError::MalformedRecord {
            line: 0,
            reason: format!("gzip decompression of {} failed: {}", path, e),
        })?;
    Ok(Bytes::from(decompressed))
}

/// Decode one partition object into raw rows.
///
/// The header row must name a timestamp column and each of `components`
/// (case-insensitive, any order). Short rows are kept with missing
/// components so the parser can count them as rejects.
pub fn decode_partition(path: &str, data: Bytes, components: &[String; 3]) -> Result<Vec<RawRecord>> {
    let data = decompress(path, data)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(&data[..]);

    let headers = reader
        .headers()
        .map_err(|e| NowcastError::MalformedRecord {
            line: 1,
            reason: format!("unreadable header: {}", e),
        })?
        .clone();

    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };

    let timestamp_idx = column(&TIMESTAMP_COLUMNS).ok_or_else(|| NowcastError::MalformedRecord {
        line: 1,
        reason: format!("no timestamp column in header of {}", path),
    })?;

    let mut component_idx = [0usize; 3];
    for (slot, name) in component_idx.iter_mut().zip(components.iter()) {
        *slot = column(&[name.as_str()]).ok_or_else(|| NowcastError::MalformedRecord {
            line: 1,
            reason: format!("no '{}' column in header of {}", name, path),
        })?;
    }

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(path = %path, error = %e, "Unreadable CSV row");
                continue;
            }
        };
        // Header is line 1; fall back to the row index when the reader has
        // no position for this record.
        let line = row
            .position()
            .map(|p| p.line())
            .unwrap_or(i as u64 + 2);

        let field = |idx: usize| row.get(idx).filter(|v| !v.is_empty()).map(str::to_string);
        records.push(RawRecord {
            source: path.to_string(),
            line,
            timestamp: field(timestamp_idx),
            components: component_idx.map(field),
        });
    }

    Ok(records)
}
