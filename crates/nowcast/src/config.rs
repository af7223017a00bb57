//! Nowcast configuration.
//!
//! A single YAML document carries the data source, the pipeline settings and
//! the station registry. Every section is optional; anything left out falls
//! back to the built-in New Zealand deployment.
//!
//! ```yaml
//! source:
//!   bucket: geonet-open-data
//!   region: ap-southeast-2
//! pipeline:
//!   window_minutes: 15
//!   gap_tolerance_secs: 180
//! registry:
//!   thresholds: { no_activity: 20.0, possible: 50.0 }
//!   stations: [...]
//!   regions: [...]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use geomag_common::StationRegistry;
use storage::ObjectStorageConfig;

use crate::derivative::DerivativeEngine;
use crate::error::{NowcastError, Result};
use crate::snapshot::SnapshotSettings;

/// One day; a wider window would span more than two day partitions.
pub const MAX_WINDOW_MINUTES: u32 = 1_440;
pub const MAX_GAP_TOLERANCE_SECS: u64 = 86_400;
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 3_600;
pub const MAX_UPDATE_INTERVAL_MINUTES: u32 = 1_440;

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of the trailing window ending at run time
    pub window_minutes: u32,
    /// Consecutive samples further apart than this are a gap
    pub gap_tolerance_secs: u64,
    /// Per-station fetch timeout
    pub fetch_timeout_secs: u64,
    /// Advertised as `next_update` in the status document
    pub update_interval_minutes: u32,
    pub max_concurrent_fetches: usize,
    /// Object key prefix in front of `{station}/{YYYY}/{MM}/{DD}`
    pub key_prefix: String,
    /// CSV column names for the x, y and z components
    pub components: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_minutes: 15,
            gap_tolerance_secs: 180,
            fetch_timeout_secs: 30,
            update_interval_minutes: 15,
            max_concurrent_fetches: 4,
            key_prefix: String::new(),
            components: vec!["x".to_string(), "y".to_string(), "z".to_string()],
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_minutes == 0 {
            return Err(NowcastError::InvalidConfig("window_minutes must be positive".to_string()));
        }
        if self.gap_tolerance_secs == 0 {
            return Err(NowcastError::InvalidConfig(
                "gap_tolerance_secs must be positive".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(NowcastError::InvalidConfig(
                "fetch_timeout_secs must be positive".to_string(),
            ));
        }
        if self.window_minutes > MAX_WINDOW_MINUTES {
            return Err(NowcastError::InvalidConfig(format!(
                "window_minutes must be at most {}, got {}",
                MAX_WINDOW_MINUTES, self.window_minutes
            )));
        }
        if self.gap_tolerance_secs > MAX_GAP_TOLERANCE_SECS {
            return Err(NowcastError::InvalidConfig(format!(
                "gap_tolerance_secs must be at most {}, got {}",
                MAX_GAP_TOLERANCE_SECS, self.gap_tolerance_secs
            )));
        }
        if self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(NowcastError::InvalidConfig(format!(
                "fetch_timeout_secs must be at most {}, got {}",
                MAX_FETCH_TIMEOUT_SECS, self.fetch_timeout_secs
            )));
        }
        if self.update_interval_minutes > MAX_UPDATE_INTERVAL_MINUTES {
            return Err(NowcastError::InvalidConfig(format!(
                "update_interval_minutes must be at most {}, got {}",
                MAX_UPDATE_INTERVAL_MINUTES, self.update_interval_minutes
            )));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(NowcastError::InvalidConfig(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.components.len() != 3 {
            return Err(NowcastError::InvalidConfig(format!(
                "expected 3 component columns, got {}",
                self.components.len()
            )));
        }
        let lower: Vec<String> = self.components.iter().map(|c| c.trim().to_lowercase()).collect();
        if lower.iter().any(|c| c.is_empty()) || lower[0] == lower[1] || lower[0] == lower[2] || lower[1] == lower[2] {
            return Err(NowcastError::InvalidConfig(format!(
                "component columns must be distinct and non-empty: {:?}",
                self.components
            )));
        }
        Ok(())
    }

    // The duration helpers clamp to the validated bounds so an unvalidated
    // config can never wrap into a negative or overflowing duration.

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.window_minutes.min(MAX_WINDOW_MINUTES)))
    }

    pub fn update_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(
            self.update_interval_minutes.min(MAX_UPDATE_INTERVAL_MINUTES),
        ))
    }

    pub fn gap_tolerance(&self) -> chrono::Duration {
        let secs = self.gap_tolerance_secs.min(MAX_GAP_TOLERANCE_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(MAX_GAP_TOLERANCE_SECS as i64))
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs.min(MAX_FETCH_TIMEOUT_SECS))
    }

    /// Component column names; call after `validate`.
    pub fn components_array(&self) -> [String; 3] {
        let column = |i: usize| self.components.get(i).cloned().unwrap_or_default();
        [column(0), column(1), column(2)]
    }

    pub fn engine(&self) -> DerivativeEngine {
        DerivativeEngine::new(self.gap_tolerance())
    }

    pub fn snapshot_settings(&self) -> SnapshotSettings {
        SnapshotSettings {
            window: self.window(),
            update_interval: self.update_interval(),
            max_concurrent_fetches: self.max_concurrent_fetches,
        }
    }
}

/// Complete nowcast configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NowcastConfig {
    #[serde(default)]
    pub source: ObjectStorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub registry: StationRegistry,
}

impl NowcastConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: NowcastConfig = serde_yaml::from_str(yaml)
            .map_err(|e| NowcastError::InvalidConfig(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NowcastError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            NowcastError::InvalidConfig(msg) => {
                NowcastError::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        debug!(
            path = %path.display(),
            stations = config.registry.stations.len(),
            regions = config.registry.regions.len(),
            "Loaded nowcast config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.registry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NowcastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.window(), chrono::Duration::minutes(15));
        assert_eq!(config.pipeline.gap_tolerance(), chrono::Duration::seconds(180));
        assert_eq!(config.pipeline.fetch_timeout(), std::time::Duration::from_secs(30));
        assert_eq!(config.registry.regions.len(), 5);
        assert_eq!(config.source.bucket, "geonet-open-data");
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = NowcastConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, NowcastConfig::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = NowcastConfig::from_yaml_str(include_str!("../../../config/nowcast.yaml")).unwrap();
        assert_eq!(config, NowcastConfig::default());
    }

    #[test]
    fn test_partial_pipeline_section() {
        let yaml = r#"
pipeline:
  window_minutes: 30
  components: [X, Y, Z]
"#;
        let config = NowcastConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.pipeline.window_minutes, 30);
        assert_eq!(config.pipeline.gap_tolerance_secs, 180);
        assert_eq!(config.pipeline.components_array(), ["X", "Y", "Z"].map(String::from));
    }

    #[test]
    fn test_registry_override() {
        let yaml = r#"
registry:
  thresholds:
    no_activity: 10.0
    possible: 30.0
  stations:
    - { id: EY2M, name: Eyrewell, latitude: -43.42, longitude: 172.35, region: Canterbury }
  regions:
    - { id: Canterbury, display_name: Canterbury, multiplier: 1.0, stations: [EY2M] }
"#;
        let config = NowcastConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.registry.stations.len(), 1);
        assert_eq!(config.registry.thresholds.possible, 30.0);
    }

    #[test]
    fn test_rejects_unknown_station_reference() {
        let yaml = r#"
registry:
  stations: []
  regions:
    - { id: Otago, display_name: Otago, multiplier: 1.2, stations: [NOPE] }
"#;
        assert!(NowcastConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_bad_pipeline_settings() {
        let mut pipeline = PipelineConfig::default();
        pipeline.components = vec!["x".into(), "y".into()];
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.components = vec!["x".into(), "X".into(), "z".into()];
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.max_concurrent_fetches = 0;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.gap_tolerance_secs = 0;
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_durations() {
        let yaml = "pipeline:\n  gap_tolerance_secs: 18446744073709551615\n";
        let err = NowcastConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("gap_tolerance_secs"));

        let mut pipeline = PipelineConfig::default();
        pipeline.window_minutes = MAX_WINDOW_MINUTES + 1;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.fetch_timeout_secs = u64::MAX;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.update_interval_minutes = u32::MAX;
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineConfig::default();
        pipeline.gap_tolerance_secs = MAX_GAP_TOLERANCE_SECS;
        pipeline.window_minutes = MAX_WINDOW_MINUTES;
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_unvalidated_durations_never_wrap() {
        let pipeline = PipelineConfig {
            gap_tolerance_secs: u64::MAX,
            fetch_timeout_secs: u64::MAX,
            window_minutes: u32::MAX,
            update_interval_minutes: u32::MAX,
            ..PipelineConfig::default()
        };
        assert_eq!(pipeline.gap_tolerance(), chrono::Duration::seconds(MAX_GAP_TOLERANCE_SECS as i64));
        assert!(pipeline.gap_tolerance() > chrono::Duration::zero());
        assert_eq!(pipeline.window(), chrono::Duration::minutes(i64::from(MAX_WINDOW_MINUTES)));
        assert_eq!(pipeline.update_interval(), chrono::Duration::days(1));
        assert_eq!(pipeline.fetch_timeout(), std::time::Duration::from_secs(MAX_FETCH_TIMEOUT_SECS));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowcast.yaml");
        std::fs::write(&path, "pipeline: [not, a, map]").unwrap();

        let err = NowcastConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("nowcast.yaml"));
        assert!(NowcastConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
