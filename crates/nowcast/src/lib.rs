//! Geomagnetic dB/dt aurora nowcast library.
//!
//! Turns raw magnetometer records into a per-region aurora visibility
//! classification.
//!
//! # Architecture
//!
//! One run is a straight pipeline:
//!
//! - Fetch the day partitions covering the trailing window (object storage)
//! - Parse rows into validated samples, dropping malformed ones
//! - Compute each station's peak dB/dt, skipping data gaps
//! - Classify each region from the maximum of its usable stations
//! - Assemble the status document and write it atomically
//!
//! Station failures never abort a run; they surface as `No Data` regions
//! and per-station errors in the document.

pub mod aggregator;
pub mod config;
pub mod derivative;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod sample;
pub mod snapshot;

// Re-exports
pub use aggregator::{ActivityLevel, RegionEntry, RegionState, RegionStatus, RegionalAggregator};
pub use config::{NowcastConfig, PipelineConfig};
pub use derivative::{DerivativeEngine, DerivativeResult, StationPeak, Unavailable};
pub use error::{NowcastError, Result};
pub use fetcher::{decode_partition, ObjectStoreFetcher, SampleFetcher};
pub use parser::{parse_record, parse_records, ParseReport, ParsedSeries};
pub use pipeline::{StationPipeline, StationReport};
pub use sample::{RawRecord, Sample};
pub use snapshot::{
    write_snapshot, DataSource, GenerationInfo, SnapshotBuilder, SnapshotSettings, StationSummary,
    StatusSnapshot,
};
