//! Common types and utilities shared across the aurora nowcast crates.

pub mod error;
pub mod station;
pub mod time;

pub use error::{GeomagError, GeomagResult};
pub use station::{
    BaseThresholds, EffectiveThresholds, Region, RegionId, Station, StationId, StationRegistry,
};
pub use time::{PartitionKey, TimeWindow};
